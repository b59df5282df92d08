//! Display state: option set, orientation, toggle rules, and the menu model.

pub mod menu;
pub mod options;
pub mod state;

#[cfg(test)]
mod test_properties;
