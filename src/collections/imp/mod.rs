mod buffer;

pub(crate) use buffer::*;
