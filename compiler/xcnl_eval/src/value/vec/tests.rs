use super::*;
use crate::errors::EvalErrorKind;
use pretty_assertions::assert_eq;

fn vec_of(scalar: Scalar, values: &[Value]) -> GeneralVec {
    GeneralVec::with_values(scalar, values.len(), values).unwrap()
}

#[test]
fn test_owned_length_bounds() {
    assert!(GeneralVec::new(Scalar::F32, 1).is_err());
    assert!(GeneralVec::new(Scalar::F32, 2).is_ok());
    assert!(GeneralVec::new(Scalar::F32, 4).is_ok());
    assert!(GeneralVec::new(Scalar::F32, 5).is_err());
}

#[test]
fn test_construction_initializers() {
    let zeros = GeneralVec::with_values(Scalar::I32, 3, &[]).unwrap();
    assert_eq!(zeros.to_string(), "[0, 0, 0]");

    let splat = GeneralVec::with_values(Scalar::I32, 3, &[Value::Int(7)]).unwrap();
    assert_eq!(splat.to_string(), "[7, 7, 7]");

    let err = GeneralVec::with_values(Scalar::I32, 3, &[Value::Int(1), Value::Int(2)]).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::LengthMismatch { expected: 3, got: 2 });
}

#[test]
fn test_fields_and_length() {
    let v = vec_of(Scalar::U32, &[Value::Uint(1), Value::Uint(2)]);
    assert_eq!(v.field("x").unwrap(), Value::Uint(1));
    assert_eq!(v.field("y").unwrap(), Value::Uint(2));
    assert_eq!(v.field("Length").unwrap(), Value::Uint(2));

    let err = v.field("z").unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::IndexOutOfRange {
            type_name: "u32v2".to_string(),
            access: "z".to_string(),
            len: 2
        }
    );
    assert!(matches!(
        v.field("q").unwrap_err().kind,
        EvalErrorKind::UndefinedField { .. }
    ));
}

#[test]
fn test_negative_index() {
    let v = vec_of(Scalar::I16, &[Value::Int(1), Value::Int(-2), Value::Int(3)]);
    assert_eq!(v.index(-1).unwrap(), Value::Int(3));
    assert_eq!(v.index(1).unwrap(), Value::Int(-2));
    assert!(v.index(3).is_err());
    assert!(v.index(-4).is_err());
}

#[test]
fn test_assign_equal_length_and_broadcast() {
    let a = vec_of(Scalar::F32, &[Value::Float(0.0), Value::Float(0.0)]);
    let b = vec_of(Scalar::F32, &[Value::Float(1.5), Value::Float(2.5)]);
    a.assign(&Value::Custom(CustomValue::Vec(b))).unwrap();
    assert_eq!(a.to_string(), "[1.5, 2.5]");

    a.assign(&Value::Int(4)).unwrap();
    assert_eq!(a.to_string(), "[4, 4]");

    let c = GeneralVec::new(Scalar::F32, 3).unwrap();
    let err = a.assign(&Value::Custom(CustomValue::Vec(c))).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::LengthMismatch { expected: 2, got: 3 });

    assert!(matches!(
        a.assign(&Value::string("nope")).unwrap_err().kind,
        EvalErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn test_element_conversion_truncates() {
    let v = GeneralVec::new(Scalar::U8, 2).unwrap();
    v.assign_index(0, &Value::Int(300)).unwrap();
    v.assign_index(1, &Value::Float(7.9)).unwrap();
    assert_eq!(v.to_values(), vec![Value::Uint(44), Value::Uint(7)]);
}

#[test]
fn test_half_elements() {
    let v = vec_of(Scalar::F16, &[Value::Float(0.5), Value::Float(-2.0)]);
    assert_eq!(v.to_values(), vec![Value::Float(0.5), Value::Float(-2.0)]);
    assert_eq!(v.type_name(), "f16v2");
}

#[test]
fn test_view_writes_through_to_host() {
    let host = VecStorage::from_u64s(&[1, 1, 1]);
    let view = GeneralVec::view(host.clone(), 0, Scalar::U64, 3, false).unwrap();
    assert!(view.is_view());
    view.assign_field("y", &Value::Int(8)).unwrap();
    view.assign_index(-1, &Value::Uint(4)).unwrap();
    assert_eq!(host.to_u64s(), vec![1, 8, 4]);
}

#[test]
fn test_read_only_view_is_not_mutated() {
    let host = VecStorage::from_u64s(&[5, 6]);
    let view = GeneralVec::view(host.clone(), 0, Scalar::U64, 2, true).unwrap();
    assert!(matches!(
        view.assign(&Value::Int(0)).unwrap_err().kind,
        EvalErrorKind::ReadOnly { .. }
    ));
    assert!(view.assign_field("x", &Value::Int(0)).is_err());
    assert_eq!(host.to_u64s(), vec![5, 6]);
}

#[test]
fn test_view_bounds() {
    let host = VecStorage::zeroed(16);
    assert!(GeneralVec::view(host.clone(), 8, Scalar::U32, 2, false).is_ok());
    assert!(GeneralVec::view(host.clone(), 8, Scalar::U32, 3, false).is_err());
    assert!(GeneralVec::view(host, 0, Scalar::U8, 17, false).is_err());
}

#[test]
fn test_ref_count_follows_handles() {
    let v = GeneralVec::new(Scalar::I32, 2).unwrap();
    assert_eq!(v.ref_count(), 1);
    let shared = v.clone();
    assert_eq!(v.ref_count(), 2);
    shared.assign_field("x", &Value::Int(9)).unwrap();
    assert_eq!(v.field("x").unwrap(), Value::Int(9));
    drop(shared);
    assert_eq!(v.ref_count(), 1);
}

#[test]
fn test_same_values_across_element_types() {
    let a = vec_of(Scalar::I32, &[Value::Int(1), Value::Int(2)]);
    let b = vec_of(Scalar::F32, &[Value::Float(1.0), Value::Float(2.0)]);
    let c = vec_of(Scalar::F32, &[Value::Float(1.0), Value::Float(2.5)]);
    assert!(a.same_values(&b));
    assert!(!a.same_values(&c));
}
