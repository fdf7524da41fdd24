//! Three-layer option resolution and call-site map decoding.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::{
    application::error::DiagramError,
    domain::{
        options::{DiagramOptions, OptionOverrides},
        themes::theme_id,
    },
};

/// Merge `site` then `call` over `defaults`, validate, and check both
/// theme names against the catalogs.
pub fn resolve(
    defaults: &DiagramOptions,
    site: &OptionOverrides,
    call: &OptionOverrides,
) -> Result<DiagramOptions, DiagramError> {
    let mut options = defaults.clone();
    options.apply(site);
    options.apply(call);
    options.validate()?;
    theme_id(&options.light_theme)?;
    theme_id(&options.dark_theme)?;
    Ok(options)
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Center,
    DarkTheme,
    LayoutEngine,
    LightTheme,
    Minify,
    Padding,
    Salt,
    Scale,
    Sketch,
}

impl Field {
    /// Match a map key ignoring ASCII case, `_` and `-`.
    fn lookup(key: &str) -> Option<Self> {
        let normalized: String = key
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "center" => Some(Field::Center),
            "darktheme" => Some(Field::DarkTheme),
            "layoutengine" => Some(Field::LayoutEngine),
            "lighttheme" => Some(Field::LightTheme),
            "minify" => Some(Field::Minify),
            "padding" => Some(Field::Padding),
            "salt" => Some(Field::Salt),
            "scale" => Some(Field::Scale),
            "sketch" => Some(Field::Sketch),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Field::Center => "center",
            Field::DarkTheme => "dark_theme",
            Field::LayoutEngine => "layout_engine",
            Field::LightTheme => "light_theme",
            Field::Minify => "minify",
            Field::Padding => "padding",
            Field::Salt => "salt",
            Field::Scale => "scale",
            Field::Sketch => "sketch",
        }
    }
}

/// Decode an options map (call-site arguments or the `[diagrams.d2]` site
/// section) into an override layer.
///
/// Unknown keys are ignored and `null` leaves a field unset. Known keys with
/// values that cannot be coerced are rejected, as are two spellings of the
/// same field in one map.
pub fn overrides_from_map(map: &Map<String, Value>) -> Result<OptionOverrides, DiagramError> {
    let mut overrides = OptionOverrides::default();
    let mut seen: HashMap<&'static str, &str> = HashMap::new();
    for (key, value) in map {
        let Some(field) = Field::lookup(key) else {
            continue;
        };
        if let Some(first) = seen.insert(field.name(), key.as_str()) {
            return Err(DiagramError::DuplicateOption {
                field: field.name(),
                first: first.to_string(),
                second: key.clone(),
            });
        }
        if value.is_null() {
            continue;
        }
        match field {
            Field::Center => overrides.center = Some(as_bool(field, value)?),
            Field::DarkTheme => overrides.dark_theme = Some(as_string(field, value)?),
            Field::LayoutEngine => overrides.layout_engine = Some(as_string(field, value)?),
            Field::LightTheme => overrides.light_theme = Some(as_string(field, value)?),
            Field::Minify => overrides.minify = Some(as_bool(field, value)?),
            Field::Padding => overrides.padding = Some(as_padding(field, value)?),
            Field::Salt => overrides.salt = Some(as_string(field, value)?),
            Field::Scale => overrides.scale = Some(as_scale(field, value)?),
            Field::Sketch => overrides.sketch = Some(as_bool(field, value)?),
        }
    }
    Ok(overrides)
}

fn as_string(field: Field, value: &Value) -> Result<String, DiagramError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(DiagramError::option_decode(field.name(), "a string", other)),
    }
}

fn as_bool(field: Field, value: &Value) -> Result<bool, DiagramError> {
    let parsed = match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        Value::Number(number) => match number.as_f64() {
            Some(n) if n == 1.0 => Some(true),
            Some(n) if n == 0.0 => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed.ok_or_else(|| DiagramError::option_decode(field.name(), "a boolean", value))
}

fn as_padding(field: Field, value: &Value) -> Result<u16, DiagramError> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u16::MAX))
        .map(|n| n as u16)
        .ok_or_else(|| DiagramError::option_decode(field.name(), "a non-negative integer", value))
}

fn as_scale(field: Field, value: &Value) -> Result<f64, DiagramError> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.ok_or_else(|| DiagramError::option_decode(field.name(), "a number", value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::error::{ThemeLookupError, ValidationError};

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn later_layers_win_and_unset_fields_fall_through() {
        let site = OptionOverrides {
            padding: Some(40),
            light_theme: Some("Terminal".to_string()),
            ..Default::default()
        };
        let call = OptionOverrides {
            padding: Some(8),
            ..Default::default()
        };

        let options = resolve(&DiagramOptions::default(), &site, &call).expect("resolved");

        assert_eq!(options.padding, 8);
        assert_eq!(options.light_theme, "Terminal");
        assert_eq!(options.dark_theme, "Dark Flagship Terrastruct");
        assert!(options.minify);
    }

    #[test]
    fn validation_precedes_theme_lookup() {
        let call = OptionOverrides {
            light_theme: Some("Arthur Dent".to_string()),
            scale: Some(0.0),
            ..Default::default()
        };
        let err = resolve(&DiagramOptions::default(), &OptionOverrides::default(), &call)
            .expect_err("invalid");
        assert!(matches!(
            err,
            DiagramError::Validation(ValidationError::ScaleOutOfRange)
        ));
    }

    #[test]
    fn unknown_themes_are_rejected() {
        let call = OptionOverrides {
            dark_theme: Some("Arthur Dent".to_string()),
            ..Default::default()
        };
        let err = resolve(&DiagramOptions::default(), &OptionOverrides::default(), &call)
            .expect_err("unknown theme");
        match err {
            DiagramError::ThemeLookup(ThemeLookupError::Unknown(name)) => {
                assert_eq!(name, "Arthur Dent")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn map_keys_ignore_case_and_separators() {
        let overrides = overrides_from_map(&map(json!({
            "darkTheme": "Dark Mauve",
            "LAYOUT-ENGINE": "elk",
            "light_theme": "Origami",
            "unknown": 12,
        })))
        .expect("decoded");

        assert_eq!(overrides.dark_theme.as_deref(), Some("Dark Mauve"));
        assert_eq!(overrides.layout_engine.as_deref(), Some("elk"));
        assert_eq!(overrides.light_theme.as_deref(), Some("Origami"));
        assert_eq!(overrides.padding, None);
    }

    #[test]
    fn weak_coercions() {
        let overrides = overrides_from_map(&map(json!({
            "padding": 20.0,
            "scale": "1.5",
            "sketch": "yes",
            "center": 1,
            "minify": "off",
            "salt": 7,
            "lightTheme": null,
        })))
        .expect("decoded");

        assert_eq!(overrides.padding, Some(20));
        assert_eq!(overrides.scale, Some(1.5));
        assert_eq!(overrides.sketch, Some(true));
        assert_eq!(overrides.center, Some(true));
        assert_eq!(overrides.minify, Some(false));
        assert_eq!(overrides.salt.as_deref(), Some("7"));
        assert_eq!(overrides.light_theme, None);
    }

    #[test]
    fn rejects_uncoercible_values() {
        let cases = [
            (json!({"padding": -1}), "padding"),
            (json!({"padding": 2.5}), "padding"),
            (json!({"padding": 70000}), "padding"),
            (json!({"sketch": "maybe"}), "sketch"),
            (json!({"scale": [1]}), "scale"),
            (json!({"salt": {"a": 1}}), "salt"),
        ];

        for (input, field) in cases {
            let err = overrides_from_map(&map(input.clone())).expect_err("rejected");
            match err {
                DiagramError::OptionDecode { field: got, .. } => {
                    assert_eq!(got, field, "input {input}")
                }
                other => panic!("unexpected error for {input}: {other:?}"),
            }
        }
    }

    #[test]
    fn two_spellings_of_one_field_are_rejected() {
        let err = overrides_from_map(&map(json!({
            "darkTheme": "Dark Mauve",
            "dark_theme": "Dark Flagship Terrastruct",
        })))
        .expect_err("duplicate field");

        match err {
            DiagramError::DuplicateOption {
                field,
                first,
                second,
            } => {
                assert_eq!(field, "dark_theme");
                let mut spellings = [first, second];
                spellings.sort();
                assert_eq!(spellings, ["darkTheme", "dark_theme"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_error_message_names_value() {
        let err = overrides_from_map(&map(json!({"padding": "wide"}))).expect_err("rejected");
        assert_eq!(
            err.to_string(),
            "option `padding`: expected a non-negative integer, found \"wide\""
        );
    }
}
