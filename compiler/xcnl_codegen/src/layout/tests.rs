use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use xcnl_ir::Scalar;

fn vec_field(ty: VecType, name: &str) -> FieldDecl<'_> {
    FieldDecl {
        ty: FieldType::Vec(ty),
        name,
        extents: &[],
        align: None,
        flags: ArgFlags::empty(),
        extra: Vec::new(),
    }
}

const F32: VecType = VecType::scalar(Scalar::F32);
const F32V4: VecType = VecType::new(Scalar::F32, 4);

#[test]
fn test_scalars_pack_back_to_back() {
    let mut s = XcnlStruct::new("Pair");
    s.add_field(vec_field(F32, "a")).unwrap();
    s.add_field(vec_field(F32, "b")).unwrap();
    s.fill_field_offsets(&[]).unwrap();

    assert_eq!(s.fields[0].offset, 0);
    assert_eq!(s.fields[1].offset, 4);
    assert_eq!((s.alignment, s.size), (4, 8));
}

#[test]
fn test_explicit_align_pins_offset() {
    let mut s = XcnlStruct::new("Pinned");
    s.add_field(vec_field(F32, "a")).unwrap();
    s.add_field(FieldDecl {
        align: Some(16),
        ..vec_field(F32, "b")
    })
    .unwrap();
    s.fill_field_offsets(&[]).unwrap();

    assert_eq!(s.fields[1].offset, 16);
    assert!(s.alignment >= 16);
    assert_eq!(s.size, 32);
}

#[test]
fn test_vec4_aligns_to_its_size() {
    let mut s = XcnlStruct::new("Data");
    s.add_field(vec_field(F32, "a")).unwrap();
    s.add_field(vec_field(F32V4, "b")).unwrap();
    s.fill_field_offsets(&[]).unwrap();

    assert_eq!(s.fields[1].offset, 16);
    assert_eq!((s.alignment, s.size), (16, 32));
}

#[test]
fn test_three_wide_vectors_take_four_lanes() {
    let mut s = XcnlStruct::new("V3");
    s.add_field(vec_field(VecType::new(Scalar::F32, 3), "p")).unwrap();
    s.add_field(vec_field(F32, "w")).unwrap();
    s.fill_field_offsets(&[]).unwrap();
    assert_eq!(s.fields[1].offset, 16);
}

#[test]
fn test_arrays_share_interned_dims() {
    let mut s = XcnlStruct::new("Grid");
    s.add_field(FieldDecl {
        extents: &[2, 3],
        ..vec_field(F32, "a")
    })
    .unwrap();
    s.add_field(FieldDecl {
        extents: &[2, 3],
        ..vec_field(VecType::scalar(Scalar::U8), "b")
    })
    .unwrap();
    s.fill_field_offsets(&[]).unwrap();

    assert_eq!(s.fields[0].dims, s.fields[1].dims);
    assert_eq!(
        s.field_dims(&s.fields[0]),
        &[
            ArrayDim {
                extent: 2,
                stride: 3
            },
            ArrayDim {
                extent: 3,
                stride: 1
            }
        ]
    );
    assert_eq!(s.fields[1].offset, 24);
    assert_eq!(s.size, 32);
}

#[test]
fn test_array_count_overflow_rejected() {
    let mut s = XcnlStruct::new("Huge");
    assert!(s
        .add_field(FieldDecl {
            extents: &[256, 257],
            ..vec_field(F32, "a")
        })
        .is_err());
    assert!(s
        .add_field(FieldDecl {
            extents: &[0],
            ..vec_field(F32, "b")
        })
        .is_err());
    assert!(s.fields.is_empty());
}

#[test]
fn test_duplicate_field_and_bad_align_rejected() {
    let mut s = XcnlStruct::new("Dup");
    s.add_field(vec_field(F32, "a")).unwrap();
    assert!(s.add_field(vec_field(F32, "a")).is_err());
    assert!(s
        .add_field(FieldDecl {
            align: Some(12),
            ..vec_field(F32, "c")
        })
        .is_err());
}

#[test]
fn test_nested_struct_uses_its_layout() {
    let mut inner = XcnlStruct::new("Inner");
    inner.add_field(vec_field(F32V4, "v")).unwrap();
    inner.fill_field_offsets(&[]).unwrap();
    let structs = vec![inner];

    let mut outer = XcnlStruct::new("Outer");
    outer.add_field(vec_field(VecType::scalar(Scalar::U8), "tag")).unwrap();
    outer
        .add_field(FieldDecl {
            ty: FieldType::Struct(0),
            extents: &[2],
            ..vec_field(F32, "items")
        })
        .unwrap();
    outer.fill_field_offsets(&structs).unwrap();

    assert_eq!(outer.fields[1].offset, 16);
    assert_eq!((outer.alignment, outer.size), (16, 48));
    assert_eq!(
        outer.describe(&structs),
        "struct Outer (size 48, align 16)\n[0] u8 tag\n[16] Inner items[2]\n"
    );
}

#[test]
fn test_huge_alignment_overflows_size() {
    let mut s = XcnlStruct::new("Wide");
    s.add_field(vec_field(F32, "a")).unwrap();
    s.add_field(FieldDecl {
        align: Some(1 << 31),
        ..vec_field(F32, "b")
    })
    .unwrap();

    let err = s.fill_field_offsets(&[]).unwrap_err();
    assert_eq!(
        err.message,
        format!("Size of struct [Wide] exceeds {} bytes", u32::MAX)
    );
    assert_eq!((s.fields[1].offset, s.alignment, s.size), (0, 1, 0));
}

#[test]
fn test_nested_array_overflows_field_end() {
    let mut inner = XcnlStruct::new("A");
    inner
        .add_field(FieldDecl {
            extents: &[65535],
            ..vec_field(VecType::new(Scalar::U64, 4), "a")
        })
        .unwrap();
    inner.fill_field_offsets(&[]).unwrap();
    assert_eq!(inner.size, 32 * 65535);
    let structs = vec![inner];

    let mut outer = XcnlStruct::new("B");
    outer
        .add_field(FieldDecl {
            ty: FieldType::Struct(0),
            extents: &[65535],
            ..vec_field(F32, "x")
        })
        .unwrap();
    let err = outer.fill_field_offsets(&structs).unwrap_err();
    assert_eq!(
        err.message,
        format!("Field [x] of struct [B] lies beyond {} bytes", u32::MAX)
    );
}

#[test]
fn test_stringify_natural_layout() {
    let mut s = XcnlStruct::new("Data");
    s.add_field(vec_field(F32, "a")).unwrap();
    s.add_field(vec_field(F32V4, "b")).unwrap();
    s.fill_field_offsets(&[]).unwrap();

    assert_eq!(
        s.stringify(&[], "\n"),
        "typedef struct Data\n{\n    /*     0 */ float a;\n    /*    16 */ float4 b;\n} Data;\n"
    );
}

#[test]
fn test_stringify_pads_explicit_alignment() {
    let mut s = XcnlStruct::new("Padded");
    s.add_field(vec_field(F32, "a")).unwrap();
    s.add_field(FieldDecl {
        align: Some(32),
        ..vec_field(F32, "b")
    })
    .unwrap();
    s.fill_field_offsets(&[]).unwrap();

    assert_eq!(
        s.stringify(&[], "\n"),
        "typedef struct Padded\n{\n\
         \x20   /*     0 */ float a;\n\
         \x20   /*     4 */ uchar _pad1[28];\n\
         \x20   /*    32 */ float b;\n\
         \x20   /*    36 */ uchar _pad_tail[28];\n\
         } __attribute__((aligned(32))) Padded;\n"
    );
}

#[test]
fn test_vec_type_names() {
    assert_eq!(vec_type_name(F32V4), "float4");
    assert_eq!(vec_type_name(VecType::scalar(Scalar::U8)), "uchar");
    assert_eq!(vec_type_name(VecType::new(Scalar::F16, 2)), "half2");
    assert_eq!(vec_type_name(VecType::new(Scalar::I64, 16)), "long16");
}

fn any_vec_type() -> impl Strategy<Value = VecType> {
    let scalar = prop_oneof![
        Just(Scalar::U8),
        Just(Scalar::I16),
        Just(Scalar::U32),
        Just(Scalar::F16),
        Just(Scalar::F32),
        Just(Scalar::F64),
    ];
    let dim = prop_oneof![Just(1_u8), Just(2), Just(3), Just(4), Just(8)];
    (scalar, dim).prop_map(|(scalar, dim)| VecType::new(scalar, dim))
}

fn any_field() -> impl Strategy<Value = (VecType, Option<u32>, Vec<u32>)> {
    (
        any_vec_type(),
        proptest::option::of(prop_oneof![Just(4_u32), Just(16), Just(64)]),
        proptest::collection::vec(1_u32..5, 0..3),
    )
}

proptest! {
    #[test]
    fn offsets_are_aligned_and_do_not_overlap(
        fields in proptest::collection::vec(any_field(), 1..12)
    ) {
        let names: Vec<String> = (0..fields.len()).map(|i| format!("f{i}")).collect();
        let mut s = XcnlStruct::new("Random");
        for ((ty, align, extents), name) in fields.iter().zip(&names) {
            s.add_field(FieldDecl {
                ty: FieldType::Vec(*ty),
                name,
                extents,
                align: *align,
                flags: ArgFlags::empty(),
                extra: Vec::new(),
            })
            .unwrap();
        }
        s.fill_field_offsets(&[]).unwrap();

        let mut end = 0;
        for (field, (ty, align, _)) in s.fields.iter().zip(&fields) {
            let required = align.map_or(ty.size_bytes(), |a| a.max(ty.size_bytes()));
            prop_assert_eq!(field.offset % required, 0);
            prop_assert!(field.offset >= end);
            prop_assert!(s.alignment >= required);
            end = field.offset + s.element_count(field) * ty.size_bytes();
        }
        prop_assert!(s.size >= end);
        prop_assert_eq!(s.size % s.alignment, 0);
    }
}
