use anyhow::{bail, Context, Result};

use super::config::Band;

/// Which way risk grows relative to a range's bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Higher values carry more risk (`>`, `>=`)
    Rising,
    /// Lower values carry more risk (`<`, `<=`)
    Falling,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeOp {
    LessThan(f64),
    LessEqual(f64),
    GreaterThan(f64),
    GreaterEqual(f64),
}

impl RangeOp {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(val) = s.strip_prefix(">=") {
            Ok(RangeOp::GreaterEqual(parse_bound(val, s)?))
        } else if let Some(val) = s.strip_prefix("<=") {
            Ok(RangeOp::LessEqual(parse_bound(val, s)?))
        } else if let Some(val) = s.strip_prefix('>') {
            Ok(RangeOp::GreaterThan(parse_bound(val, s)?))
        } else if let Some(val) = s.strip_prefix('<') {
            Ok(RangeOp::LessThan(parse_bound(val, s)?))
        } else {
            bail!("Range must start with <, <=, > or >=: {}", s)
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        match self {
            RangeOp::LessThan(n) => value < *n,
            RangeOp::LessEqual(n) => value <= *n,
            RangeOp::GreaterThan(n) => value > *n,
            RangeOp::GreaterEqual(n) => value >= *n,
        }
    }

    pub fn bound(&self) -> f64 {
        match self {
            RangeOp::LessThan(n)
            | RangeOp::LessEqual(n)
            | RangeOp::GreaterThan(n)
            | RangeOp::GreaterEqual(n) => *n,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            RangeOp::LessThan(_) | RangeOp::LessEqual(_) => Direction::Falling,
            RangeOp::GreaterThan(_) | RangeOp::GreaterEqual(_) => Direction::Rising,
        }
    }

    /// How far `value` lies past the bound, measured in the direction of rising risk.
    pub fn excess(&self, value: f64) -> f64 {
        let distance = match self.direction() {
            Direction::Rising => value - self.bound(),
            Direction::Falling => self.bound() - value,
        };
        distance.max(0.0)
    }
}

fn parse_bound(val: &str, whole: &str) -> Result<f64> {
    let n: f64 = val
        .trim()
        .parse()
        .with_context(|| format!("Invalid number in range: {}", whole))?;
    if !n.is_finite() {
        bail!("Range bound must be finite: {}", whole)
    }
    Ok(n)
}

/// Additive contribution of a matched band.
///
/// Formats:
/// - `+N` flat amount
/// - `+R per U` R points per U units past the band's bound
/// - `+B then +R per U` base amount plus the per-unit part
/// - any per-unit form may end with `max C`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Add(f64),
    AddPerUnit {
        base: f64,
        rate: f64,
        unit: f64,
        cap: Option<f64>,
    },
}

impl Effect {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        let (body, cap) = match s.split_once(" max ") {
            Some((body, cap)) => {
                let cap: f64 = cap
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid cap in effect: {}", s))?;
                (body.trim(), Some(cap))
            }
            None => (s, None),
        };

        // Check for "per" modifier
        if let Some((amount_part, per_part)) = body.split_once(" per ") {
            let unit: f64 = per_part
                .trim()
                .parse()
                .with_context(|| format!("Invalid unit in effect: {}", s))?;
            if !(unit.is_finite() && unit > 0.0) {
                bail!("Unit after 'per' must be positive: {}", s)
            }
            let (base, rate) = match amount_part.split_once(" then ") {
                Some((base, rate)) => (parse_amount(base, s)?, parse_amount(rate, s)?),
                None => (0.0, parse_amount(amount_part, s)?),
            };
            Ok(Effect::AddPerUnit {
                base,
                rate,
                unit,
                cap,
            })
        } else if cap.is_some() {
            bail!("'max' only applies to per-unit effects: {}", s)
        } else if body.contains(" then ") {
            bail!("'then' must be followed by a per-unit amount: {}", s)
        } else {
            Ok(Effect::Add(parse_amount(body, s)?))
        }
    }

    /// Points for a value `excess` units past the band's bound.
    pub fn apply(&self, excess: f64) -> f64 {
        match self {
            Effect::Add(n) => *n,
            Effect::AddPerUnit {
                base,
                rate,
                unit,
                cap,
            } => {
                let points = base + rate * (excess / unit);
                match cap {
                    Some(c) => points.min(*c),
                    None => points,
                }
            }
        }
    }

    pub fn is_non_negative(&self) -> bool {
        match self {
            Effect::Add(n) => *n >= 0.0,
            Effect::AddPerUnit { base, rate, cap, .. } => {
                *base >= 0.0 && *rate >= 0.0 && cap.map_or(true, |c| c >= 0.0)
            }
        }
    }
}

fn parse_amount(part: &str, whole: &str) -> Result<f64> {
    match part.trim().strip_prefix('+') {
        Some(val) => {
            let n: f64 = val
                .trim()
                .parse()
                .with_context(|| format!("Invalid amount in effect: {}", whole))?;
            if !n.is_finite() {
                bail!("Effect amount must be finite: {}", whole)
            }
            Ok(n)
        }
        None => bail!("Effect amount must start with +: {}", whole),
    }
}

#[derive(Debug, Clone)]
pub struct CompiledBand {
    pub range: RangeOp,
    pub effect: Effect,
    pub label: Option<String>,
}

/// Points awarded by a band table for one value.
#[derive(Debug, Clone, PartialEq)]
pub struct BandMatch<'a> {
    pub points: f64,
    pub label: Option<&'a str>,
}

/// Ordered band table for one attribute. First match wins.
#[derive(Debug, Clone, Default)]
pub struct BandTable {
    bands: Vec<CompiledBand>,
}

impl BandTable {
    pub fn compile(bands: &[Band]) -> Result<Self> {
        let bands = bands
            .iter()
            .map(|band| {
                Ok(CompiledBand {
                    range: RangeOp::parse(&band.range)?,
                    effect: Effect::parse(&band.effect)?,
                    label: band.label.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[CompiledBand] {
        &self.bands
    }

    pub fn evaluate(&self, value: f64) -> Option<BandMatch<'_>> {
        self.bands
            .iter()
            .find(|band| band.range.matches(value))
            .map(|band| BandMatch {
                points: band.effect.apply(band.range.excess(value)),
                label: band.label.as_deref(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_less_than() {
        let range = RangeOp::parse("<40").unwrap();
        assert!(range.matches(35.0));
        assert!(!range.matches(40.0));
        assert!(!range.matches(45.0));
    }

    #[test]
    fn test_parse_range_less_equal() {
        let range = RangeOp::parse("<=40").unwrap();
        assert!(range.matches(40.0));
        assert!(!range.matches(40.1));
    }

    #[test]
    fn test_parse_range_greater_than() {
        let range = RangeOp::parse(">5.4").unwrap();
        assert!(!range.matches(5.4));
        assert!(range.matches(5.5));
    }

    #[test]
    fn test_parse_range_greater_equal() {
        let range = RangeOp::parse(">= 6.5").unwrap();
        assert!(!range.matches(6.4));
        assert!(range.matches(6.5));
        assert!(range.matches(9.0));
    }

    #[test]
    fn test_parse_range_rejects_bare_number() {
        assert!(RangeOp::parse("100").is_err());
        assert!(RangeOp::parse(">abc").is_err());
        assert!(RangeOp::parse(">inf").is_err());
    }

    #[test]
    fn test_range_excess_follows_direction() {
        assert!((RangeOp::parse(">=100").unwrap().excess(142.0) - 42.0).abs() < 1e-9);
        assert!((RangeOp::parse("<40").unwrap().excess(35.0) - 5.0).abs() < 1e-9);
        assert_eq!(RangeOp::parse("<40").unwrap().excess(45.0), 0.0);
        assert_eq!(RangeOp::parse("<40").unwrap().direction(), Direction::Falling);
    }

    #[test]
    fn test_parse_effect_add() {
        let effect = Effect::parse("+50").unwrap();
        assert_eq!(effect.apply(3.0), 50.0);
    }

    #[test]
    fn test_parse_effect_per_unit() {
        let effect = Effect::parse("+1.5 per 1").unwrap();
        assert_eq!(effect.apply(4.0), 6.0);
    }

    #[test]
    fn test_parse_effect_per_larger_unit() {
        // 3 points per 10 mg/dL
        let effect = Effect::parse("+3 per 10").unwrap();
        assert!((effect.apply(25.0) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_effect_base_then_rate() {
        let effect = Effect::parse("+5 then +1.5 per 1").unwrap();
        assert_eq!(effect.apply(0.0), 5.0);
        assert_eq!(effect.apply(10.0), 20.0);
    }

    #[test]
    fn test_parse_effect_cap() {
        let effect = Effect::parse("+0.8 per 1 max 25").unwrap();
        assert_eq!(effect.apply(10.0), 8.0);
        assert_eq!(effect.apply(50.0), 25.0);
    }

    #[test]
    fn test_parse_effect_rejects_multiply() {
        assert!(Effect::parse("x2").is_err());
        assert!(Effect::parse("+2 per 0").is_err());
        assert!(Effect::parse("+2 max 5").is_err());
        assert!(Effect::parse("+2 then +3").is_err());
    }

    #[test]
    fn test_negative_effect_parses_but_is_flagged() {
        let effect = Effect::parse("+-5").unwrap();
        assert!(!effect.is_non_negative());
        assert!(Effect::parse("+5").unwrap().is_non_negative());
    }

    #[test]
    fn test_band_table_first_match_wins() {
        let table = BandTable::compile(&[
            Band::new(">=6.5", "+50").with_label("Diabetes range"),
            Band::new(">=5.7", "+3 then +30 per 1"),
        ])
        .unwrap();

        let hit = table.evaluate(7.2).unwrap();
        assert_eq!(hit.points, 50.0);
        assert_eq!(hit.label, Some("Diabetes range"));

        let hit = table.evaluate(6.0).unwrap();
        assert!((hit.points - 12.0).abs() < 1e-9);
        assert_eq!(hit.label, None);

        assert!(table.evaluate(5.0).is_none());
    }

    #[test]
    fn test_band_table_compile_error() {
        assert!(BandTable::compile(&[Band::new("6.5", "+50")]).is_err());
    }
}
