use std::error::Error;

use zn5::codec::CompressorConfiguration;
use zn5::data_type::DataType;
use zn5::dataset::{create_dataset, open_dataset, Dataset, DatasetError, DatasetTraits};
use zn5::metadata::{DataFormat, DatasetMetadata, FillValueMetadata};
use zn5::ChunkShape;

fn metadata(
    format: DataFormat,
    shape: Vec<u64>,
    chunk_shape: Vec<u64>,
    data_type: DataType,
    fill_value: i64,
    compressor: CompressorConfiguration,
) -> DatasetMetadata {
    DatasetMetadata::new(
        format,
        shape,
        ChunkShape::try_from(chunk_shape).unwrap(),
        data_type,
        FillValueMetadata::Number(serde_json::Number::from(fill_value)),
        compressor,
    )
    .unwrap()
}

#[test]
fn n5_boundary_chunk_shapes() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;
    let dataset = Dataset::<f32>::create(
        tmp.path().join("set.n5"),
        metadata(
            DataFormat::N5,
            vec![20, 20, 20],
            vec![13, 5, 9],
            DataType::Float32,
            0,
            CompressorConfiguration::Raw,
        ),
    )?;

    assert_eq!(dataset.dimensionality(), 3);
    assert_eq!(dataset.chunks_per_dimension(), &[2, 4, 3]);
    assert_eq!(dataset.num_chunks(), 24);
    assert_eq!(dataset.max_chunk_num_elements(), 13 * 5 * 9);
    assert_eq!(dataset.num_elements(), 8000);

    assert_eq!(dataset.chunk_shape(&[0, 0, 0])?, vec![13, 5, 9]);
    assert_eq!(dataset.chunk_shape(&[1, 0, 0])?, vec![7, 5, 9]);
    assert_eq!(dataset.chunk_shape(&[1, 0, 1])?, vec![7, 5, 9]);
    assert_eq!(dataset.chunk_shape(&[1, 0, 2])?, vec![7, 5, 2]);
    assert_eq!(dataset.chunk_shape_extent(&[1, 0, 2], 2)?, 2);
    assert_eq!(dataset.chunk_num_elements(&[1, 0, 2])?, 7 * 5 * 2);
    Ok(())
}

#[test]
fn zarr_chunk_shapes_are_fixed() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;
    let dataset = Dataset::<f32>::create(
        tmp.path().join("set.zarr"),
        metadata(
            DataFormat::Zarr,
            vec![20, 20, 20],
            vec![13, 5, 9],
            DataType::Float32,
            0,
            CompressorConfiguration::Raw,
        ),
    )?;

    // boundary chunks store the full chunk shape under Zarr
    assert_eq!(dataset.chunk_shape(&[1, 0, 2])?, vec![13, 5, 9]);
    assert_eq!(dataset.chunk_num_elements(&[1, 0, 2])?, 13 * 5 * 9);
    Ok(())
}

#[test]
fn read_missing_chunk_returns_fill_value() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;

    let dataset = Dataset::<i32>::create(
        tmp.path().join("set.n5"),
        metadata(
            DataFormat::N5,
            vec![10],
            vec![4],
            DataType::Int32,
            -1,
            CompressorConfiguration::Raw,
        ),
    )?;
    // the last chunk has actual size 2
    assert_eq!(dataset.chunk_num_elements(&[2])?, 2);
    let mut read = vec![0i32; 2];
    dataset.read_chunk(&[2], &mut read)?;
    assert_eq!(read, vec![-1, -1]);

    let dataset = Dataset::<i32>::create(
        tmp.path().join("set.zarr"),
        metadata(
            DataFormat::Zarr,
            vec![10],
            vec![4],
            DataType::Int32,
            -1,
            CompressorConfiguration::Raw,
        ),
    )?;
    let mut read = vec![0i32; 4];
    dataset.read_chunk(&[2], &mut read)?;
    assert_eq!(read, vec![-1, -1, -1, -1]);
    Ok(())
}

#[cfg(feature = "zlib")]
#[test]
fn zarr_zlib_round_trip() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;
    let dataset = Dataset::<i16>::create(
        tmp.path().join("set.zarr"),
        metadata(
            DataFormat::Zarr,
            vec![8, 8],
            vec![4, 4],
            DataType::Int16,
            0,
            CompressorConfiguration::Zlib(serde_json::from_str(r#"{"level": 5}"#)?),
        ),
    )?;

    let elements: Vec<i16> = (0..16).collect();
    dataset.write_chunk(&[1, 1], &elements)?;

    let mut read = vec![0i16; 16];
    dataset.read_chunk(&[1, 1], &mut read)?;
    assert_eq!(read, elements);
    Ok(())
}

#[test]
fn round_trip_all_codecs() -> Result<(), Box<dyn Error>> {
    let mut compressors = vec![CompressorConfiguration::Raw];
    #[cfg(feature = "zlib")]
    compressors.push(CompressorConfiguration::Zlib(serde_json::from_str(
        r#"{"level": 1}"#,
    )?));
    #[cfg(feature = "bzip2")]
    compressors.push(CompressorConfiguration::Bzip2(serde_json::from_str(
        r#"{"level": 9}"#,
    )?));
    #[cfg(feature = "blosc")]
    compressors.push(CompressorConfiguration::Blosc(serde_json::from_str(
        r#"{"cname": "lz4", "clevel": 5, "shuffle": 1, "blocksize": 0}"#,
    )?));

    for (i, compressor) in compressors.into_iter().enumerate() {
        for format in [DataFormat::Zarr, DataFormat::N5] {
            let tmp = tempfile::TempDir::new()?;
            let dataset = Dataset::<u16>::create(
                tmp.path().join(format!("set{i}")),
                metadata(
                    format,
                    vec![12, 12],
                    vec![6, 6],
                    DataType::UInt16,
                    0,
                    compressor.clone(),
                ),
            )?;
            let elements: Vec<u16> = (0..36).map(|i| i * 7).collect();
            dataset.write_chunk(&[1, 0], &elements)?;
            let mut read = vec![0u16; 36];
            dataset.read_chunk(&[1, 0], &mut read)?;
            assert_eq!(read, elements, "{} {format}", dataset.codec_identifier());
        }
    }
    Ok(())
}

#[test]
fn n5_boundary_chunk_round_trip() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;
    let dataset = Dataset::<f64>::create(
        tmp.path().join("set.n5"),
        metadata(
            DataFormat::N5,
            vec![20, 20, 20],
            vec![13, 5, 9],
            DataType::Float64,
            0,
            CompressorConfiguration::Raw,
        ),
    )?;

    // a boundary chunk carries only its truncated element count
    let elements: Vec<f64> = (0..7 * 5 * 2).map(f64::from).collect();
    dataset.write_chunk(&[1, 0, 2], &elements)?;

    let mut read = vec![0.0f64; 7 * 5 * 2];
    dataset.read_chunk(&[1, 0, 2], &mut read)?;
    assert_eq!(read, elements);

    // the header records the actual per-dimension sizes big-endian
    let raw = std::fs::read(tmp.path().join("set.n5/1/0/2"))?;
    assert_eq!(
        &raw[..16],
        &[0, 0, 0, 3, 0, 0, 0, 7, 0, 0, 0, 5, 0, 0, 0, 2]
    );
    Ok(())
}

#[test]
fn write_chunk_rejects_wrong_buffer_length() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;
    let dataset = Dataset::<f64>::create(
        tmp.path().join("set.n5"),
        metadata(
            DataFormat::N5,
            vec![20],
            vec![13],
            DataType::Float64,
            0,
            CompressorConfiguration::Raw,
        ),
    )?;
    // the trailing chunk stores 7 elements, not 13
    assert!(matches!(
        dataset.write_chunk(&[1], &[0.0f64; 13]),
        Err(DatasetError::UnexpectedBufferLength(13, 7))
    ));
    let mut read = vec![0.0f64; 6];
    assert!(matches!(
        dataset.read_chunk(&[1], &mut read),
        Err(DatasetError::UnexpectedBufferLength(6, 7))
    ));
    Ok(())
}

#[test]
fn request_geometry_partial_overlap() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;
    let dataset = Dataset::<u8>::create(
        tmp.path().join("set.zarr"),
        metadata(
            DataFormat::Zarr,
            vec![100],
            vec![10],
            DataType::UInt8,
            0,
            CompressorConfiguration::Raw,
        ),
    )?;

    assert_eq!(
        dataset.chunk_requests(&[7], &[15])?,
        vec![vec![0], vec![1], vec![2]]
    );

    let coordinates = dataset.request_coordinates(&[0], &[7], &[15])?;
    assert_eq!(coordinates.local_offset, vec![0]);
    assert_eq!(coordinates.local_shape, vec![3]);
    assert_eq!(coordinates.in_chunk_offset, vec![7]);
    assert!(!coordinates.complete_overlap);

    let coordinates = dataset.request_coordinates(&[1], &[7], &[15])?;
    assert_eq!(coordinates.local_offset, vec![3]);
    assert_eq!(coordinates.local_shape, vec![10]);
    assert_eq!(coordinates.in_chunk_offset, vec![0]);
    assert!(coordinates.complete_overlap);

    let coordinates = dataset.request_coordinates(&[2], &[7], &[15])?;
    assert_eq!(coordinates.local_offset, vec![13]);
    assert_eq!(coordinates.local_shape, vec![2]);
    assert_eq!(coordinates.in_chunk_offset, vec![0]);
    assert!(!coordinates.complete_overlap);

    // a request that exceeds the array shape is rejected before any IO
    assert!(matches!(
        dataset.chunk_requests(&[95], &[6]),
        Err(DatasetError::InvalidRequestSubset(_, _, _))
    ));
    Ok(())
}

#[test]
fn idempotent_writes() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;
    let dataset = Dataset::<u32>::create(
        tmp.path().join("set.zarr"),
        metadata(
            DataFormat::Zarr,
            vec![8],
            vec![4],
            DataType::UInt32,
            0,
            CompressorConfiguration::Raw,
        ),
    )?;

    let elements: Vec<u32> = vec![5, 6, 7, 8];
    dataset.write_chunk(&[1], &elements)?;
    let first = std::fs::read(tmp.path().join("set.zarr/1"))?;
    dataset.write_chunk(&[1], &elements)?;
    let second = std::fs::read(tmp.path().join("set.zarr/1"))?;
    assert_eq!(first, second);

    // the temporary used during the write does not linger
    assert!(!tmp.path().join("set.zarr/1.partial").exists());
    Ok(())
}

#[cfg(target_endian = "little")]
#[test]
fn chunk_payload_byte_order() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;
    let elements: Vec<u16> = vec![0x0102, 0x0304];

    let dataset = Dataset::<u16>::create(
        tmp.path().join("set.n5"),
        metadata(
            DataFormat::N5,
            vec![2],
            vec![2],
            DataType::UInt16,
            0,
            CompressorConfiguration::Raw,
        ),
    )?;
    dataset.write_chunk(&[0], &elements)?;
    let raw = std::fs::read(tmp.path().join("set.n5/0"))?;
    // 8 byte header, then big-endian payload
    assert_eq!(&raw[8..], &[0x01, 0x02, 0x03, 0x04]);

    let dataset = Dataset::<u16>::create(
        tmp.path().join("set.zarr"),
        metadata(
            DataFormat::Zarr,
            vec![2],
            vec![2],
            DataType::UInt16,
            0,
            CompressorConfiguration::Raw,
        ),
    )?;
    dataset.write_chunk(&[0], &elements)?;
    let raw = std::fs::read(tmp.path().join("set.zarr/0"))?;
    // headerless little-endian payload
    assert_eq!(&raw, &[0x02, 0x01, 0x04, 0x03]);
    Ok(())
}

#[test]
fn reopen_and_read() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("set.n5");
    let elements: Vec<i64> = (0..25).collect();
    {
        let dataset = Dataset::<i64>::create(
            &path,
            metadata(
                DataFormat::N5,
                vec![10, 10],
                vec![5, 5],
                DataType::Int64,
                -3,
                CompressorConfiguration::Raw,
            ),
        )?;
        dataset.write_chunk(&[1, 1], &elements)?;
    }

    let dataset = Dataset::<i64>::open(&path)?;
    assert_eq!(dataset.shape(), &[10, 10]);
    assert_eq!(dataset.fill_value(), -3);
    assert_eq!(dataset.data_type(), DataType::Int64);
    assert!(!dataset.is_zarr());
    let mut read = vec![0i64; 25];
    dataset.read_chunk(&[1, 1], &mut read)?;
    assert_eq!(read, elements);
    Ok(())
}

#[test]
fn erased_dataset_round_trip() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("set.zarr");
    {
        let dataset = create_dataset(
            &path,
            metadata(
                DataFormat::Zarr,
                vec![6],
                vec![3],
                DataType::Float32,
                0,
                CompressorConfiguration::Raw,
            ),
        )?;
        let elements: Vec<f32> = vec![1.5, -2.5, 4.0];
        dataset.write_chunk_bytes(&[1], DataType::Float32, bytemuck::cast_slice(&elements))?;

        // the element type of every buffer is checked at runtime
        assert!(matches!(
            dataset.write_chunk_bytes(&[1], DataType::Int32, &[0u8; 12]),
            Err(DatasetError::IncompatibleDataType(
                DataType::Float32,
                DataType::Int32
            ))
        ));
    }

    let dataset = open_dataset(&path)?;
    assert_eq!(dataset.data_type(), DataType::Float32);
    assert_eq!(dataset.codec_identifier(), "raw");
    assert_eq!(dataset.format(), DataFormat::Zarr);
    assert_eq!(dataset.max_chunk_num_elements(), 3);
    assert!(dataset.check_request_type(DataType::Float32).is_ok());

    let mut bytes = vec![0u8; 12];
    dataset.read_chunk_bytes(&[1], DataType::Float32, &mut bytes)?;
    let read: &[f32] = bytemuck::cast_slice(&bytes);
    assert_eq!(read, &[1.5, -2.5, 4.0]);
    Ok(())
}

#[test]
fn request_intersections_partition_the_request() -> Result<(), Box<dyn Error>> {
    let tmp = tempfile::TempDir::new()?;
    let dataset = Dataset::<u8>::create(
        tmp.path().join("set.n5"),
        metadata(
            DataFormat::N5,
            vec![20, 20, 20],
            vec![13, 5, 9],
            DataType::UInt8,
            0,
            CompressorConfiguration::Raw,
        ),
    )?;

    let (offset, shape) = (vec![1, 0, 8], vec![17, 20, 3]);
    let chunk_requests = dataset.chunk_requests(&offset, &shape)?;
    let mut covered = 0;
    for chunk_indices in &chunk_requests {
        let coordinates = dataset.request_coordinates(chunk_indices, &offset, &shape)?;
        covered += coordinates.local_shape.iter().product::<u64>();
    }
    assert_eq!(covered, shape.iter().product::<u64>());

    // no duplicates
    let mut unique = chunk_requests.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), chunk_requests.len());
    Ok(())
}
