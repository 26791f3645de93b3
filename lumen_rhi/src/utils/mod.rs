pub mod utf8_string;

pub use utf8_string::Utf8String;
