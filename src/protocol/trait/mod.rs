pub mod param;
pub mod params;

#[cfg(test)]
mod param_test;
