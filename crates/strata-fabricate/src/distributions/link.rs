use std::fmt;
use std::str::FromStr;

use super::DistributionError;
use super::sampling::normal_cdf;

/// Transform from a linear predictor to a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Link {
    #[default]
    Identity,
    Logit,
    Probit,
}

impl Link {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Link::Identity => x,
            Link::Logit => 1.0 / (1.0 + (-x).exp()),
            Link::Probit => normal_cdf(x),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Link::Identity => "identity",
            Link::Logit => "logit",
            Link::Probit => "probit",
        }
    }
}

impl FromStr for Link {
    type Err = DistributionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "identity" => Ok(Link::Identity),
            "logit" => Ok(Link::Logit),
            "probit" => Ok(Link::Probit),
            other => Err(DistributionError::UnknownLink(other.to_string())),
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_map_zero_to_one_half() {
        assert_eq!(Link::Logit.apply(0.0), 0.5);
        assert!((Link::Probit.apply(0.0) - 0.5).abs() < 1e-7);
        assert!((Link::Probit.apply(1.96) - 0.975).abs() < 1e-4);
    }

    #[test]
    fn unknown_link_is_rejected() {
        assert!(matches!(
            "cloglog".parse::<Link>(),
            Err(DistributionError::UnknownLink(_))
        ));
        assert_eq!("Probit".parse::<Link>(), Ok(Link::Probit));
    }
}
