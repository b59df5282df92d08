//! Usage computation: report parsing and metric formatting.

pub mod format;
pub mod snapshot;

#[cfg(test)]
mod test_properties;
