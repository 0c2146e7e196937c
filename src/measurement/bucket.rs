/// Logical database a measurement stream is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Dust,
    Gas,
    Climate,
    Sound,
    Light,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Dust => "dust",
            Bucket::Gas => "gas",
            Bucket::Climate => "climate",
            Bucket::Sound => "sound",
            Bucket::Light => "light",
        }
    }
}
