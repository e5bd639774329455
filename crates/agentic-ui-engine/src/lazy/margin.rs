use std::fmt;
use std::str::FromStr;

use crate::lazy::LazyError;

/// A CSS-style length: pixels, or a percentage of the viewport extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f64),
    Percent(f64),
}

impl Length {
    pub fn resolve(self, extent: f64) -> f64 {
        match self {
            Length::Px(px) => px,
            Length::Percent(p) => extent * p / 100.0,
        }
    }
}

impl FromStr for Length {
    type Err = LazyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LazyError::InvalidMargin(s.to_string());
        let s = s.trim();
        let (number, percent) = if let Some(n) = s.strip_suffix("px") {
            (n, false)
        } else if let Some(n) = s.strip_suffix('%') {
            (n, true)
        } else if s == "0" {
            (s, false)
        } else {
            return Err(invalid());
        };
        let value: f64 = number.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(if percent {
            Length::Percent(value)
        } else {
            Length::Px(value)
        })
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Px(v) => write!(f, "{v}px"),
            Length::Percent(v) => write!(f, "{v}%"),
        }
    }
}

/// Prefetch distance around the viewport, written like CSS `margin`
/// (`"200px"`, `"10px 0px"`, `"1px 2px 3px 4px"`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl RootMargin {
    pub fn uniform(px: f64) -> Self {
        let l = Length::Px(px);
        Self {
            top: l,
            right: l,
            bottom: l,
            left: l,
        }
    }

    /// Resolved `(above, below)` extensions for a viewport `height` tall.
    pub fn vertical(&self, height: f64) -> (f64, f64) {
        (self.top.resolve(height), self.bottom.resolve(height))
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::uniform(200.0)
    }
}

impl FromStr for RootMargin {
    type Err = LazyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<Length>, _>>()?;
        let (top, right, bottom, left) = match parts[..] {
            [all] => (all, all, all, all),
            [v, h] => (v, h, v, h),
            [t, h, b] => (t, h, b, h),
            [t, r, b, l] => (t, r, b, l),
            _ => return Err(LazyError::InvalidMargin(s.to_string())),
        };
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("200px", 200.0, 200.0)]
    #[case("10px 0px", 10.0, 10.0)]
    #[case("1px 2px 3px", 1.0, 3.0)]
    #[case("1px 2px 3px 4px", 1.0, 3.0)]
    #[case("0", 0.0, 0.0)]
    #[case("50%", 250.0, 250.0)]
    #[case("-20px", -20.0, -20.0)]
    fn parses_css_shorthand(#[case] input: &str, #[case] above: f64, #[case] below: f64) {
        let m: RootMargin = input.parse().unwrap();
        assert_eq!(m.vertical(500.0), (above, below));
    }

    #[rstest]
    #[case("")]
    #[case("200")]
    #[case("abc px")]
    #[case("1px 2px 3px 4px 5px")]
    #[case("NaNpx")]
    fn rejects_garbage(#[case] input: &str) {
        assert!(input.parse::<RootMargin>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let m: RootMargin = "1px 2% 3px".parse().unwrap();
        assert_eq!(m.to_string().parse::<RootMargin>().unwrap(), m);
    }
}
