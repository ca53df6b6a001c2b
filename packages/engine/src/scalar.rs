//! Scalar conversions behind the Assign, Widen, Narrow and Text coercions.

use structflex_core::{ConversionError, DomainType, Known, WireType, WireValue};

/// A converted scalar and an optional lossy-conversion note.
#[derive(Debug, PartialEq)]
pub(crate) struct Converted<T> {
    pub value: T,
    pub warning: Option<String>,
}

impl<T> Converted<T> {
    fn exact(value: T) -> Self {
        Converted {
            value,
            warning: None,
        }
    }
}

/// float32 to float64 through the shortest decimal form of the float32.
pub fn widen_f32(v: f32) -> f64 {
    format!("{}", v).parse::<f64>().unwrap_or(v as f64)
}

/// float64 to float32 through its decimal form.
pub fn narrow_f64(v: f64) -> f32 {
    format!("{}", v).parse::<f32>().unwrap_or(v as f32)
}

fn narrow_i64(v: i64) -> Converted<i32> {
    match i32::try_from(v) {
        Ok(n) => Converted::exact(n),
        Err(_) => Converted {
            value: v as i32,
            warning: Some(format!("value {} truncated to int32", v)),
        },
    }
}

fn incompatible(source: &str, target: &str) -> ConversionError {
    ConversionError::IncompatibleTypes {
        source_type: source.to_string(),
        target_type: target.to_string(),
        reason: "no scalar conversion".to_string(),
    }
}

/// Convert a known domain scalar to a non-pointer wire scalar type.
pub(crate) fn externalize(
    value: &Known,
    target: &WireType,
) -> Result<Converted<WireValue>, ConversionError> {
    let out = match (value, target) {
        (Known::Bool(b), WireType::Bool) => WireValue::Bool(*b),
        (Known::Int32(v), WireType::Int32) => WireValue::Int32(*v),
        (Known::Int32(v), WireType::Int64) => WireValue::Int64(i64::from(*v)),
        (Known::Int64(v), WireType::Int64) => WireValue::Int64(*v),
        (Known::Int64(v), WireType::Int32) => {
            let n = narrow_i64(*v);
            return Ok(Converted {
                value: WireValue::Int32(n.value),
                warning: n.warning,
            });
        }
        (Known::Float32(v), WireType::Float32) => WireValue::Float32(*v),
        (Known::Float32(v), WireType::Float64) => WireValue::Float64(widen_f32(*v)),
        (Known::Float64(v), WireType::Float64) => WireValue::Float64(*v),
        (Known::Float64(v), WireType::Float32) => WireValue::Float32(narrow_f64(*v)),
        (Known::String(s), WireType::String) => WireValue::String(s.clone()),
        (Known::String(s), WireType::Bytes) => WireValue::Bytes(s.as_bytes().to_vec()),
        _ => return Err(incompatible(value.kind_name(), &target.to_string())),
    };
    Ok(Converted::exact(out))
}

/// Convert a non-nil wire scalar to a domain scalar type.
pub(crate) fn internalize(
    value: &WireValue,
    target: &DomainType,
) -> Result<Converted<Known>, ConversionError> {
    let out = match (value, target) {
        (WireValue::Bool(b), DomainType::Bool) => Known::Bool(*b),
        (WireValue::Int32(v), DomainType::Int32) => Known::Int32(*v),
        (WireValue::Int32(v), DomainType::Int64) => Known::Int64(i64::from(*v)),
        (WireValue::Int64(v), DomainType::Int64) => Known::Int64(*v),
        (WireValue::Int64(v), DomainType::Int32) => {
            let n = narrow_i64(*v);
            return Ok(Converted {
                value: Known::Int32(n.value),
                warning: n.warning,
            });
        }
        (WireValue::Float32(v), DomainType::Float32) => Known::Float32(*v),
        (WireValue::Float32(v), DomainType::Float64) => Known::Float64(widen_f32(*v)),
        (WireValue::Float64(v), DomainType::Float64) => Known::Float64(*v),
        (WireValue::Float64(v), DomainType::Float32) => Known::Float32(narrow_f64(*v)),
        (WireValue::String(s), DomainType::String) => Known::String(s.clone()),
        (WireValue::Bytes(b), DomainType::String) => match String::from_utf8(b.clone()) {
            Ok(s) => Known::String(s),
            Err(e) => {
                return Err(ConversionError::IncompatibleTypes {
                    source_type: "[]byte".to_string(),
                    target_type: target.to_string(),
                    reason: e.to_string(),
                })
            }
        },
        _ => return Err(incompatible(&value.shape_name(), &target.to_string())),
    };
    Ok(Converted::exact(out))
}

/// The zero known value of a domain scalar type.
pub(crate) fn zero_known(ty: &DomainType) -> Option<Known> {
    Some(match ty {
        DomainType::Bool => Known::Bool(false),
        DomainType::Int32 => Known::Int32(0),
        DomainType::Int64 => Known::Int64(0),
        DomainType::Float32 => Known::Float32(0.0),
        DomainType::Float64 => Known::Float64(0.0),
        DomainType::String => Known::String(String::new()),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float32_widens_through_decimal() {
        assert_eq!(widen_f32(0.1), 0.1f64);
        assert_eq!(widen_f32(3.4), 3.4f64);
        assert_ne!(0.1f32 as f64, 0.1f64);
    }

    #[test]
    fn float64_narrows() {
        assert_eq!(narrow_f64(0.1), 0.1f32);
        assert_eq!(narrow_f64(1.5), 1.5f32);
    }

    #[test]
    fn int64_narrowing_warns_when_out_of_range() {
        let ok = externalize(&Known::Int64(42), &WireType::Int32).unwrap();
        assert_eq!(ok.value, WireValue::Int32(42));
        assert!(ok.warning.is_none());

        let lossy = externalize(&Known::Int64(1 << 33), &WireType::Int32).unwrap();
        assert_eq!(lossy.value, WireValue::Int32(0));
        assert!(lossy.warning.unwrap().contains("truncated"));
    }

    #[test]
    fn text_both_ways() {
        let out = externalize(&Known::String("héllo".into()), &WireType::Bytes).unwrap();
        assert_eq!(out.value, WireValue::Bytes("héllo".as_bytes().to_vec()));

        let back = internalize(&out.value, &DomainType::String).unwrap();
        assert_eq!(back.value, Known::String("héllo".into()));

        let bad = internalize(&WireValue::Bytes(vec![0xff, 0xfe]), &DomainType::String);
        assert!(matches!(bad, Err(ConversionError::IncompatibleTypes { .. })));
    }

    #[test]
    fn mismatched_payload_is_incompatible() {
        let err = externalize(&Known::Bool(true), &WireType::String).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot convert Bool to string: no scalar conversion"
        );
        assert!(internalize(&WireValue::Int32(1), &DomainType::String).is_err());
    }

    #[test]
    fn zero_knowns() {
        assert_eq!(zero_known(&DomainType::Int64), Some(Known::Int64(0)));
        assert_eq!(zero_known(&DomainType::list(DomainType::String)), None);
    }
}
