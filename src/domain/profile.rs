use crate::domain::features::Feature;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analysis profile: a preset controlling ensemble voting weights and the
/// default indicator subset the models are trained on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Risk-first: weight the variance-reducing forests, lean on flow and
    /// long-trend context.
    #[default]
    Conservative,
    /// Fast-turn oriented: weight the boosting component, lean on
    /// oscillators and bands.
    Momentum,
    /// Balanced voting over trend-following indicators.
    TrendFollowing,
}

/// Tree count and depth for one base model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeSpec {
    pub n_trees: usize,
    pub max_depth: Option<u16>,
}

/// Static configuration backing one [`Profile`]: base-model hyperparameters,
/// soft-vote weights and the default feature subset.
#[derive(Debug, Clone, Copy)]
pub struct ProfileSpec {
    pub boost_clf: TreeSpec,
    pub forest_clf: TreeSpec,
    /// Soft-vote weights: [boosting, forest].
    pub classifier_votes: [f64; 2],
    pub boost_reg: TreeSpec,
    pub forest_reg: TreeSpec,
    pub extra_reg: TreeSpec,
    /// Vote weights: [boosting, forest, extra-trees].
    pub regressor_votes: [f64; 3],
    pub default_features: &'static [Feature],
}

const CONSERVATIVE: ProfileSpec = ProfileSpec {
    boost_clf: TreeSpec {
        n_trees: 100,
        max_depth: Some(3),
    },
    forest_clf: TreeSpec {
        n_trees: 100,
        max_depth: None,
    },
    classifier_votes: [1.0, 2.0],
    boost_reg: TreeSpec {
        n_trees: 200,
        max_depth: Some(4),
    },
    forest_reg: TreeSpec {
        n_trees: 200,
        max_depth: Some(8),
    },
    extra_reg: TreeSpec {
        n_trees: 200,
        max_depth: Some(10),
    },
    regressor_votes: [1.0, 2.0, 2.0],
    default_features: &[
        Feature::Vwap,
        Feature::Atr,
        Feature::DistVwap,
        Feature::Sma200,
    ],
};

const MOMENTUM: ProfileSpec = ProfileSpec {
    classifier_votes: [2.0, 1.0],
    regressor_votes: [3.0, 1.0, 1.0],
    default_features: &[
        Feature::Rsi,
        Feature::Macd,
        Feature::BbUpper,
        Feature::BbLower,
        Feature::Mfi,
    ],
    ..CONSERVATIVE
};

const TREND_FOLLOWING: ProfileSpec = ProfileSpec {
    classifier_votes: [1.0, 1.0],
    regressor_votes: [1.0, 1.0, 1.0],
    default_features: &[
        Feature::Sma50,
        Feature::Sma200,
        Feature::Obv,
        Feature::Vwap,
    ],
    ..CONSERVATIVE
};

impl Profile {
    pub const fn spec(self) -> &'static ProfileSpec {
        match self {
            Profile::Conservative => &CONSERVATIVE,
            Profile::Momentum => &MOMENTUM,
            Profile::TrendFollowing => &TREND_FOLLOWING,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Conservative => "conservative",
            Profile::Momentum => "momentum",
            Profile::TrendFollowing => "trend-following",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conservative" => Ok(Profile::Conservative),
            "momentum" => Ok(Profile::Momentum),
            "trend-following" | "trend_following" | "trend" => Ok(Profile::TrendFollowing),
            _ => anyhow::bail!(
                "Invalid profile: {}. Must be 'conservative', 'momentum' or 'trend-following'",
                s
            ),
        }
    }
}
