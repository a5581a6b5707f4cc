pub mod research;

pub use research::{Credentials, Endpoints, HttpSettings, NewsSettings, ResearchConfig};
