//! Immutable tree configuration: child-count bounds and the strategy
//! kinds used for subtree selection and node splitting.

use crate::errors::{SpatialError, SpatialResult};

/// Strategy for choosing which child subtree absorbs a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectorKind {
    /// Child needing the smallest area enlargement; ties broken by
    /// smaller resulting area, then smaller existing area.
    MinimalArea,
    /// R*-tree selection: minimal overlap enlargement when choosing among
    /// leaves, minimal area enlargement elsewhere.
    RStar,
}

/// Strategy for partitioning an overflowing node into two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SplitterKind {
    /// Guttman's quadratic split: worst-pair seeds, then assignment by
    /// strongest preference.
    Quadratic,
    /// R*-tree split: margin-minimizing axis, then overlap-minimizing
    /// distribution on that axis.
    RStar,
}

/// Immutable tuning parameters shared by every node of a tree.
///
/// Validated once at construction; insertion never re-checks them.
///
/// # Examples
///
/// ```rust
/// use persistent_rtree::Config;
///
/// let config = Config::star().min_children(2).max_children(8).build()?;
/// assert_eq!(config.max_children(), 8);
/// # Ok::<(), persistent_rtree::SpatialError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "ConfigPayload")
)]
pub struct Config {
    min_children: usize,
    max_children: usize,
    selector: SelectorKind,
    splitter: SplitterKind,
}

// Deserialization funnels through `Config::new` so a persisted
// configuration cannot smuggle in unusable child-count bounds.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct ConfigPayload {
    min_children: usize,
    max_children: usize,
    selector: SelectorKind,
    splitter: SplitterKind,
}

#[cfg(feature = "serde")]
impl TryFrom<ConfigPayload> for Config {
    type Error = SpatialError;

    fn try_from(payload: ConfigPayload) -> SpatialResult<Self> {
        Config::new(
            payload.min_children,
            payload.max_children,
            payload.selector,
            payload.splitter,
        )
    }
}

impl Config {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidConfiguration`] when
    /// `max_children < 2`, `min_children < 1`, or
    /// `min_children > max_children / 2` (a split of `max_children + 1`
    /// items could not give both groups `min_children` members otherwise).
    pub fn new(
        min_children: usize,
        max_children: usize,
        selector: SelectorKind,
        splitter: SplitterKind,
    ) -> SpatialResult<Self> {
        if max_children < 2 {
            return Err(SpatialError::InvalidConfiguration(format!(
                "max_children must be at least 2, got {}",
                max_children
            )));
        }
        if min_children < 1 {
            return Err(SpatialError::InvalidConfiguration(
                "min_children must be at least 1".into(),
            ));
        }
        if min_children > max_children / 2 {
            return Err(SpatialError::InvalidConfiguration(format!(
                "min_children {} must not exceed half of max_children {}",
                min_children, max_children
            )));
        }
        Ok(Config {
            min_children,
            max_children,
            selector,
            splitter,
        })
    }

    /// Builder preset with Guttman defaults: minimal-area selection and
    /// quadratic splitting, 2..=4 children per node.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Builder preset with the R*-tree selector and splitter.
    pub fn star() -> ConfigBuilder {
        ConfigBuilder::default()
            .selector(SelectorKind::RStar)
            .splitter(SplitterKind::RStar)
    }

    /// Minimum children of every non-root node.
    pub fn min_children(&self) -> usize {
        self.min_children
    }

    /// Maximum children of every node.
    pub fn max_children(&self) -> usize {
        self.max_children
    }

    /// The configured subtree-selection strategy.
    pub fn selector(&self) -> SelectorKind {
        self.selector
    }

    /// The configured node-splitting strategy.
    pub fn splitter(&self) -> SplitterKind {
        self.splitter
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_children: 2,
            max_children: 4,
            selector: SelectorKind::MinimalArea,
            splitter: SplitterKind::Quadratic,
        }
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    min_children: usize,
    max_children: usize,
    selector: SelectorKind,
    splitter: SplitterKind,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        let defaults = Config::default();
        ConfigBuilder {
            min_children: defaults.min_children,
            max_children: defaults.max_children,
            selector: defaults.selector,
            splitter: defaults.splitter,
        }
    }
}

impl ConfigBuilder {
    /// Sets the minimum children per non-root node.
    pub fn min_children(mut self, min_children: usize) -> Self {
        self.min_children = min_children;
        self
    }

    /// Sets the maximum children per node.
    pub fn max_children(mut self, max_children: usize) -> Self {
        self.max_children = max_children;
        self
    }

    /// Sets the subtree-selection strategy.
    pub fn selector(mut self, selector: SelectorKind) -> Self {
        self.selector = selector;
        self
    }

    /// Sets the node-splitting strategy.
    pub fn splitter(mut self, splitter: SplitterKind) -> Self {
        self.splitter = splitter;
        self
    }

    /// Validates and produces the configuration.
    pub fn build(self) -> SpatialResult<Config> {
        Config::new(
            self.min_children,
            self.max_children,
            self.selector,
            self.splitter,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.min_children(), 2);
        assert_eq!(config.max_children(), 4);
        assert_eq!(
            Config::new(2, 4, config.selector(), config.splitter()).unwrap(),
            config
        );
    }

    #[test]
    fn test_builder() {
        let config = Config::builder()
            .min_children(3)
            .max_children(9)
            .splitter(SplitterKind::RStar)
            .build()
            .unwrap();
        assert_eq!(config.min_children(), 3);
        assert_eq!(config.max_children(), 9);
        assert_eq!(config.selector(), SelectorKind::MinimalArea);
        assert_eq!(config.splitter(), SplitterKind::RStar);
    }

    #[test]
    fn test_star_preset() {
        let config = Config::star().build().unwrap();
        assert_eq!(config.selector(), SelectorKind::RStar);
        assert_eq!(config.splitter(), SplitterKind::RStar);
    }

    #[test]
    fn test_rejects_max_children_below_two() {
        let err = Config::new(1, 1, SelectorKind::MinimalArea, SplitterKind::Quadratic);
        assert!(matches!(
            err,
            Err(SpatialError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_zero_min_children() {
        assert!(Config::new(0, 4, SelectorKind::MinimalArea, SplitterKind::Quadratic).is_err());
    }

    #[test]
    fn test_rejects_min_children_above_half_max() {
        assert!(Config::new(3, 5, SelectorKind::MinimalArea, SplitterKind::Quadratic).is_err());
        assert!(Config::new(2, 4, SelectorKind::MinimalArea, SplitterKind::Quadratic).is_ok());
        // 2 > 3 / 2 after integer rounding.
        assert!(Config::new(2, 3, SelectorKind::MinimalArea, SplitterKind::Quadratic).is_err());
    }

    #[test]
    fn test_min_children_one_is_allowed() {
        let config = Config::builder()
            .min_children(1)
            .max_children(2)
            .build()
            .unwrap();
        assert_eq!(config.min_children(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let config = Config::star().min_children(3).max_children(8).build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_rejects_invalid_bounds() {
        let json = r#"{"min_children":3,"max_children":5,"selector":"MinimalArea","splitter":"Quadratic"}"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }
}
