use stratum::encodings::{RoaringBoolArray, RoaringIntArray, RunEndArray, ZigZagArray};
use stratum::{
    serialize, Array, BoolArray, ChunkedArray, DType, EncodingId, PrimitiveArray, Scalar,
    StratumError, StructArray, VarBinArray,
};

fn samples() -> Vec<Array> {
    vec![
        Array::from(PrimitiveArray::from_nullable_vec(vec![
            Some(3i64),
            Some(3),
            None,
            None,
            Some(-7),
            Some(-7),
            Some(12),
        ])),
        Array::from(PrimitiveArray::from_vec(vec![2u32, 5, 9, 10, 400, 70_000])),
        Array::from(PrimitiveArray::from_vec(vec![1.5f64, 1.5, f64::NAN, -0.0])),
        Array::from(VarBinArray::from_nullable_strs([
            Some("x"),
            Some("x"),
            None,
            Some("yy"),
            Some(""),
        ])),
        Array::from(BoolArray::from_bools((0..100).map(|i| i % 17 == 0))),
    ]
}

#[test]
fn encode_decode_roundtrip() {
    for array in samples() {
        let canonical = array.to_canonical().unwrap();

        let ree = Array::from(RunEndArray::encode(&array).unwrap());
        assert_eq!(ree.to_canonical().unwrap(), canonical, "runend of {}", array.dtype());

        if array.dtype().is_signed_int() {
            let zigzag = Array::from(ZigZagArray::encode(&array).unwrap());
            assert_eq!(zigzag.to_canonical().unwrap(), canonical);
        }
        if let Ok(roaring) = RoaringBoolArray::encode(&array) {
            assert_eq!(Array::from(roaring).to_canonical().unwrap(), canonical);
        }
        if let Ok(roaring) = RoaringIntArray::encode(&array) {
            assert_eq!(Array::from(roaring).to_canonical().unwrap(), canonical);
        }
    }
}

#[test]
fn serialization_roundtrip() {
    for array in samples() {
        for candidate in [array.clone(), stratum::compress(&array).unwrap()] {
            let bytes = serialize::to_bytes(&candidate).unwrap();
            let read = serialize::from_bytes(candidate.dtype(), &bytes).unwrap();
            assert_eq!(read.encoding(), candidate.encoding());
            assert_eq!(read, candidate);
        }
    }
}

#[test]
fn compression_shrinks_runs() {
    let array = Array::from(PrimitiveArray::from_vec(vec![0i64, 0, 0, 0, 9, 9, 9, 9, 1, 5]));
    let compressed = stratum::compress(&array).unwrap();
    assert_ne!(compressed.encoding(), EncodingId::Primitive);
    assert!(compressed.nbytes() < array.nbytes());
    assert_eq!(compressed.to_canonical().unwrap(), array);
}

#[test]
fn boolean_runs_become_roaring() {
    let bools = BoolArray::from_bools((0..20_000).map(|i| i >= 10_000));
    let packed_bytes = bools.nbytes();
    let compressed = stratum::compress(&Array::from(bools)).unwrap();
    assert_eq!(compressed.len(), 20_000);
    assert_eq!(compressed.encoding(), EncodingId::RoaringBool);
    assert!(compressed.nbytes() < packed_bytes);
    assert_eq!(compressed.scalar_at(9_999).unwrap(), Scalar::Bool(false));
    assert_eq!(compressed.scalar_at(10_000).unwrap(), Scalar::Bool(true));
}

#[test]
fn zigzag_applicability() {
    let signed = Array::from(PrimitiveArray::from_vec(vec![-1i32, -1, 0, -1, 1, -1]));
    let zigzag = ZigZagArray::encode(&signed).unwrap();
    assert_eq!(zigzag.len(), 6);
    assert_eq!(Array::from(zigzag).to_canonical().unwrap(), signed);

    let unsigned = Array::from(PrimitiveArray::from_vec(vec![1u32, 2, 3]));
    assert!(matches!(
        ZigZagArray::encode(&unsigned),
        Err(StratumError::UnsupportedEncoding { .. })
    ));
}

#[test]
fn take_keeps_dtype() {
    let array = Array::from(VarBinArray::from_strs(["a", "b", "c", "d"]));
    let indices = Array::from(PrimitiveArray::from_vec(vec![0u64, 2]));
    let taken = array.take(&indices).unwrap();
    assert_eq!(taken.dtype(), &DType::utf8(false));
    assert_eq!(taken.scalars().unwrap(), vec![Scalar::from("a"), Scalar::from("c")]);
}

#[test]
fn chunked_concatenation() {
    let chunks = vec![
        Array::from(PrimitiveArray::from_vec(vec![0i64, 1, 2])),
        Array::from(PrimitiveArray::from_vec(vec![3i64, 4, 5])),
    ];
    let chunked = Array::from(ChunkedArray::try_new(DType::default_int(), chunks).unwrap());
    assert_eq!(chunked.len(), 6);
    assert_eq!(
        chunked.flatten().unwrap(),
        Array::from(PrimitiveArray::from_vec(vec![0i64, 1, 2, 3, 4, 5]))
    );
    assert_eq!(
        chunked.to_canonical().unwrap().scalars().unwrap(),
        (0..6).map(Scalar::Int).collect::<Vec<_>>()
    );
}

#[test]
fn empty_arrays_keep_dtype() {
    let empties = vec![
        Array::from(PrimitiveArray::from_vec(Vec::<i16>::new())),
        Array::from(PrimitiveArray::from_nullable_vec(Vec::<Option<u64>>::new())),
        Array::from(VarBinArray::from_strs(Vec::<String>::new())),
        Array::from(BoolArray::from_bools([])),
        Array::from(
            StructArray::from_fields([(
                "a",
                Array::from(PrimitiveArray::from_vec(Vec::<f32>::new())),
            )])
            .unwrap(),
        ),
    ];
    for empty in empties {
        let dtype = empty.dtype().clone();
        let compressed = stratum::compress(&empty).unwrap();
        assert_eq!(compressed.dtype(), &dtype);
        assert_eq!(compressed.len(), 0);

        let ree = Array::from(RunEndArray::encode(&empty).unwrap());
        assert_eq!(ree.dtype(), &dtype);
        let decoded = ree.to_canonical().unwrap();
        assert_eq!(decoded.dtype(), &dtype);
        assert!(decoded.is_empty());

        let bytes = serialize::to_bytes(&compressed).unwrap();
        let read = serialize::from_bytes(&dtype, &bytes).unwrap();
        assert_eq!(read.dtype(), &dtype);
        assert_eq!(read.len(), 0);
    }
}
