pub mod switchbot;
