use std::str::FromStr;

use crate::dataset::Proportions;
use crate::prelude::*;

pub fn non_zero_usize(value: &str) -> Result<usize> {
    match FromStr::from_str(value)? {
        value if value >= 1 => Ok(value),
        _ => Err(anyhow!("expected a positive number")),
    }
}

pub fn non_negative_f64(value: &str) -> Result<f64> {
    match f64::from_str(value)? {
        value if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(anyhow!("expected a finite non-negative number")),
    }
}

pub fn proportions(value: &str) -> Result<Proportions> {
    Proportions::from_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_usize_ok() {
        assert_eq!(non_zero_usize("5").unwrap(), 5);
        assert!(non_zero_usize("0").is_err());
        assert!(non_zero_usize("-1").is_err());
        assert!(non_zero_usize("five").is_err());
    }

    #[test]
    fn non_negative_f64_ok() {
        assert_eq!(non_negative_f64("0.1").unwrap(), 0.1);
        assert_eq!(non_negative_f64("0").unwrap(), 0.0);
        assert!(non_negative_f64("-0.1").is_err());
        assert!(non_negative_f64("NaN").is_err());
        assert!(non_negative_f64("inf").is_err());
    }
}
