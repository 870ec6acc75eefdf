pub mod annotation;
pub mod capture;
pub mod detection;
pub mod pipeline;
pub mod shared;

#[cfg(test)]
mod test_support;
