//! Configuration for the trellis layout engine.
//!
//! The config file is KDL. Unknown nodes and properties are decode errors, so
//! a typo in a key rejects the whole file rather than silently doing nothing.

use knuffel::errors::DecodeError;
use miette::{miette, Context, IntoDiagnostic};

#[derive(knuffel::Decode, Debug, Default, Clone, PartialEq)]
pub struct Config {
    #[knuffel(child, default)]
    pub layout: Layout,
}

#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Layout {
    #[knuffel(child, unwrap(argument), default)]
    pub default_layout: DefaultLayout,
    #[knuffel(child, unwrap(argument), default)]
    pub default_orientation: DefaultOrientation,
    #[knuffel(child, unwrap(argument), default = FloatOrInt(30.))]
    pub accordion_padding: FloatOrInt<0, 65535>,
    #[knuffel(child, unwrap(argument), default = FloatOrInt(1.))]
    pub dwindle_default_split_ratio: FloatOrInt<0, 2>,
    #[knuffel(child, unwrap(argument), default = FloatOrInt(1.))]
    pub split_width_multiplier: FloatOrInt<0, 16>,
    #[knuffel(child, unwrap(argument), default = FloatOrInt(0.5))]
    pub master_default_percent: FloatOrInt<0, 1>,
    #[knuffel(child, unwrap(argument), default = FloatOrInt(0.8))]
    pub focused_width_ratio: FloatOrInt<0, 1>,
    #[knuffel(child, unwrap(argument), default = FloatOrInt(1.))]
    pub mouse_sensitivity: FloatOrInt<0, 64>,
    #[knuffel(child, unwrap(argument), default = true)]
    pub no_outer_gaps_in_fullscreen: bool,
    #[knuffel(child, default)]
    pub gaps: Gaps,
    #[knuffel(child, default)]
    pub normalization: Normalization,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            default_layout: DefaultLayout::default(),
            default_orientation: DefaultOrientation::default(),
            accordion_padding: FloatOrInt(30.),
            dwindle_default_split_ratio: FloatOrInt(1.),
            split_width_multiplier: FloatOrInt(1.),
            master_default_percent: FloatOrInt(0.5),
            focused_width_ratio: FloatOrInt(0.8),
            mouse_sensitivity: FloatOrInt(1.),
            no_outer_gaps_in_fullscreen: true,
            gaps: Gaps::default(),
            normalization: Normalization::default(),
        }
    }
}

/// Layout assigned to the root container of a new workspace.
#[derive(knuffel::DecodeScalar, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DefaultLayout {
    #[default]
    Tiles,
    Accordion,
    Dwindle,
    Scroll,
    Master,
}

/// Orientation assigned to the root container of a new workspace.
///
/// `Auto` picks the orientation from the monitor's aspect ratio.
#[derive(knuffel::DecodeScalar, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DefaultOrientation {
    Horizontal,
    Vertical,
    #[default]
    Auto,
}

#[derive(knuffel::Decode, Debug, Default, Clone, Copy, PartialEq)]
pub struct Gaps {
    #[knuffel(child, default)]
    pub inner: InnerGaps,
    #[knuffel(child, default)]
    pub outer: OuterGaps,
}

#[derive(knuffel::Decode, Debug, Default, Clone, Copy, PartialEq)]
pub struct InnerGaps {
    #[knuffel(property, default)]
    pub horizontal: FloatOrInt<0, 65535>,
    #[knuffel(property, default)]
    pub vertical: FloatOrInt<0, 65535>,
}

#[derive(knuffel::Decode, Debug, Default, Clone, Copy, PartialEq)]
pub struct OuterGaps {
    #[knuffel(property, default)]
    pub top: FloatOrInt<0, 65535>,
    #[knuffel(property, default)]
    pub bottom: FloatOrInt<0, 65535>,
    #[knuffel(property, default)]
    pub left: FloatOrInt<0, 65535>,
    #[knuffel(property, default)]
    pub right: FloatOrInt<0, 65535>,
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    #[knuffel(child, unwrap(argument), default = true)]
    pub flatten_containers: bool,
    #[knuffel(child, unwrap(argument), default = true)]
    pub opposite_orientation_for_nested_containers: bool,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            flatten_containers: true,
            opposite_orientation_for_nested_containers: true,
        }
    }
}

impl Config {
    pub fn parse(filename: &str, text: &str) -> miette::Result<Self> {
        let config = knuffel::parse::<Config>(filename, text)
            .into_diagnostic()
            .context("error parsing config")?;
        config.validate()?;
        Ok(config)
    }

    /// Range checks that the scalar decoder cannot express.
    fn validate(&self) -> miette::Result<()> {
        let layout = &self.layout;

        let percent = layout.master_default_percent.0;
        if !(0.1..=0.9).contains(&percent) {
            return Err(miette!(
                "master-default-percent must be between 0.1 and 0.9, got {percent}"
            ));
        }

        let ratio = layout.dwindle_default_split_ratio.0;
        if !(0.1..=1.9).contains(&ratio) {
            return Err(miette!(
                "dwindle-default-split-ratio must be between 0.1 and 1.9, got {ratio}"
            ));
        }

        let focused = layout.focused_width_ratio.0;
        if !(0.1..=1.0).contains(&focused) {
            return Err(miette!(
                "focused-width-ratio must be between 0.1 and 1.0, got {focused}"
            ));
        }

        let multiplier = layout.split_width_multiplier.0;
        if multiplier <= 0. {
            return Err(miette!(
                "split-width-multiplier must be positive, got {multiplier}"
            ));
        }

        Ok(())
    }
}

/// Scalar that accepts both integer and decimal literals, bounds-checked at
/// decode time.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FloatOrInt<const FROM: i32, const TO: i32>(pub f64);

impl<S, const FROM: i32, const TO: i32> knuffel::DecodeScalar<S> for FloatOrInt<FROM, TO>
where
    S: knuffel::traits::ErrorSpan,
{
    fn type_check(
        type_name: &Option<knuffel::span::Spanned<knuffel::ast::TypeName, S>>,
        ctx: &mut knuffel::decode::Context<S>,
    ) {
        if let Some(type_name) = &type_name {
            ctx.emit_error(DecodeError::TypeName {
                span: type_name.span().clone(),
                found: Some((**type_name).clone()),
                expected: knuffel::errors::ExpectedType::no_type(),
                rust_type: std::any::type_name::<Self>(),
            });
        }
    }

    fn raw_decode(
        val: &knuffel::span::Spanned<knuffel::ast::Literal, S>,
        ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        match &**val {
            knuffel::ast::Literal::Int(v) => match v.try_into() {
                Ok(v) => {
                    let v: i32 = v;
                    if (FROM..=TO).contains(&v) {
                        Ok(FloatOrInt(f64::from(v)))
                    } else {
                        ctx.emit_error(DecodeError::conversion(
                            val,
                            format!("value must be between {FROM} and {TO}"),
                        ));
                        Ok(FloatOrInt::default())
                    }
                }
                Err(e) => {
                    ctx.emit_error(DecodeError::conversion(val, e));
                    Ok(FloatOrInt::default())
                }
            },
            knuffel::ast::Literal::Decimal(v) => match v.try_into() {
                Ok(v) => {
                    let v: f64 = v;
                    if (f64::from(FROM)..=f64::from(TO)).contains(&v) {
                        Ok(FloatOrInt(v))
                    } else {
                        ctx.emit_error(DecodeError::conversion(
                            val,
                            format!("value must be between {FROM} and {TO}"),
                        ));
                        Ok(FloatOrInt::default())
                    }
                }
                Err(e) => {
                    ctx.emit_error(DecodeError::conversion(val, e));
                    Ok(FloatOrInt::default())
                }
            },
            _ => {
                ctx.emit_error(DecodeError::scalar_kind(
                    knuffel::decode::Kind::Int,
                    val,
                ));
                Ok(FloatOrInt::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[track_caller]
    fn parse(text: &str) -> Config {
        Config::parse("test.kdl", text).unwrap()
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let config = parse("");
        assert_eq!(config, Config::default());
        assert_eq!(config.layout.accordion_padding.0, 30.);
        assert_eq!(config.layout.master_default_percent.0, 0.5);
        assert_eq!(config.layout.focused_width_ratio.0, 0.8);
        assert!(config.layout.no_outer_gaps_in_fullscreen);
        assert!(config.layout.normalization.flatten_containers);
    }

    #[test]
    fn parse_full_layout_section() {
        let config = parse(
            r##"
            layout {
                default-layout "dwindle"
                default-orientation "horizontal"
                accordion-padding 24
                dwindle-default-split-ratio 1.2
                split-width-multiplier 1.5
                master-default-percent 0.6
                focused-width-ratio 0.7
                mouse-sensitivity 2
                no-outer-gaps-in-fullscreen false
                gaps {
                    inner horizontal=10 vertical=8
                    outer top=4 bottom=4 left=6 right=6
                }
                normalization {
                    flatten-containers false
                    opposite-orientation-for-nested-containers true
                }
            }
            "##,
        );

        let layout = config.layout;
        assert_eq!(layout.default_layout, DefaultLayout::Dwindle);
        assert_eq!(layout.default_orientation, DefaultOrientation::Horizontal);
        assert_eq!(layout.accordion_padding.0, 24.);
        assert_eq!(layout.dwindle_default_split_ratio.0, 1.2);
        assert_eq!(layout.split_width_multiplier.0, 1.5);
        assert_eq!(layout.master_default_percent.0, 0.6);
        assert_eq!(layout.focused_width_ratio.0, 0.7);
        assert_eq!(layout.mouse_sensitivity.0, 2.);
        assert!(!layout.no_outer_gaps_in_fullscreen);
        assert_eq!(layout.gaps.inner.horizontal.0, 10.);
        assert_eq!(layout.gaps.inner.vertical.0, 8.);
        assert_eq!(layout.gaps.outer.top.0, 4.);
        assert_eq!(layout.gaps.outer.left.0, 6.);
        assert!(!layout.normalization.flatten_containers);
        assert!(layout.normalization.opposite_orientation_for_nested_containers);
    }

    #[test]
    fn unknown_key_rejects_config() {
        let result = Config::parse(
            "test.kdl",
            r##"
            layout {
                accordeon-padding 24
            }
            "##,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_property_rejects_config() {
        let result = Config::parse(
            "test.kdl",
            r##"
            layout {
                gaps {
                    inner sideways=10
                }
            }
            "##,
        );
        assert!(result.is_err());
    }

    #[test]
    fn master_percent_out_of_range_is_rejected() {
        for value in ["0.05", "0.95"] {
            let text = format!("layout {{ master-default-percent {value} }}");
            assert!(Config::parse("test.kdl", &text).is_err(), "{value}");
        }
    }

    #[test]
    fn dwindle_ratio_out_of_range_is_rejected() {
        let result = Config::parse(
            "test.kdl",
            "layout { dwindle-default-split-ratio 1.95 }",
        );
        assert!(result.is_err());
    }

    #[test]
    fn int_literals_decode_into_float_fields() {
        let config = parse("layout { accordion-padding 16; }");
        assert_eq!(config.layout.accordion_padding.0, 16.);
    }
}
