//! End-to-end transfer tests against the in-memory reference stores
//!
//! These tests drive the public API the way a file-format backend would be
//! driven: region-mapped raster transfers, heterogeneous column sets, and
//! the chunked row engine, with call counts checked through a delegating
//! store wrapper.

use fitsdata::{
    read_column, read_columns, read_region_into, write_column, write_columns, write_raster,
    write_region_from, ColumnInfo, ColumnValue, Dyn, ElementIo, FileMemRegions, Fix, MemImage,
    MemTable, Position, Region, Result, Segment, TableStore, VecColumn, VecRaster,
};
use rand::Rng;
use std::cell::Cell;

/// Table store that counts bounded element calls to its inner [`MemTable`]
struct CountingTable {
    inner: MemTable,
    reads: Cell<usize>,
    writes: Cell<usize>,
}

impl CountingTable {
    fn new(inner: MemTable) -> Self {
        Self {
            inner,
            reads: Cell::new(0),
            writes: Cell::new(0),
        }
    }
}

impl TableStore for CountingTable {
    fn row_count(&self) -> Result<i64> {
        self.inner.row_count()
    }

    fn preferred_row_chunk_size(&self) -> Result<i64> {
        self.inner.preferred_row_chunk_size()
    }

    fn lookup_column_index(&self, name: &str) -> Result<i64> {
        self.inner.lookup_column_index(name)
    }
}

impl<T: ColumnValue> ElementIo<T> for CountingTable {
    fn read_elements(
        &self,
        index: i64,
        rows: Segment,
        repeat_count: i64,
        out: &mut [T],
    ) -> Result<()> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_elements(index, rows, repeat_count, out)
    }

    fn write_elements(
        &mut self,
        index: i64,
        rows: Segment,
        repeat_count: i64,
        data: &[T],
    ) -> Result<()> {
        self.writes.set(self.writes.get() + 1);
        self.inner.write_elements(index, rows, repeat_count, data)
    }
}

#[test]
fn test_raster_region_roundtrip_fixed_arity() {
    let mut store = MemImage::<i32>::new(Position::from_slice(&[8, 6])).unwrap();

    let raster = VecRaster::new(
        Position::<Fix<2>>::from([3, 2]),
        vec![10, 11, 12, 20, 21, 22],
    )
    .unwrap();
    // Whole raster into file region starting at (2, 3)
    let out_regions = FileMemRegions::from_memory_region(
        Position::from([2, 3]),
        Region::new(Position::from([0, 0]), Position::from([2, 1])),
    );
    write_region_from(&mut store, &out_regions, &raster).unwrap();

    // Read it back into the middle of a larger raster
    let mut target = VecRaster::<i32, Fix<2>>::zeroed(Position::from([10, 10])).unwrap();
    let in_regions = FileMemRegions::from_file_region(
        Region::new(Position::from([2, 3]), Position::from([4, 4])),
        Position::from([4, 4]),
    );
    read_region_into(&store, &in_regions, &mut target).unwrap();

    for y in 0..2 {
        for x in 0..3 {
            assert_eq!(
                target[&Position::from([4 + x, 4 + y])],
                raster[&Position::from([x, y])]
            );
        }
    }
    assert_eq!(target[&Position::from([3, 4])], 0);
    assert_eq!(target[&Position::from([7, 4])], 0);
}

#[test]
fn test_raster_region_roundtrip_dynamic_arity() {
    let mut store = MemImage::<f32>::new(Position::from_slice(&[4, 3, 2])).unwrap();

    let raster = VecRaster::<f32, Dyn>::new(
        Position::from_slice(&[4, 3, 2]),
        (0..24).map(|i| i as f32).collect(),
    )
    .unwrap();
    write_raster(&mut store, &raster).unwrap();

    // One plane of the cube into a matching 3-D raster
    let mut plane = VecRaster::<f32, Dyn>::zeroed(Position::from_slice(&[4, 3, 1])).unwrap();
    let regions = FileMemRegions::at_memory_origin(Region::new(
        Position::from_slice(&[0, 0, 1]),
        Position::from_slice(&[3, 2, 1]),
    ));
    read_region_into(&store, &regions, &mut plane).unwrap();
    assert_eq!(plane.as_slice(), &raster.as_slice()[12..24]);
}

#[test]
fn test_open_back_resolution_places_memory_region() {
    // Whole file region, memory starting at (5, 5): against a 10x10 file the
    // memory region must resolve to (5,5)..(14,14).
    let mut store = MemImage::<i32>::new(Position::from_slice(&[10, 10])).unwrap();
    let checker = VecRaster::new(
        Position::<Fix<2>>::from([10, 10]),
        (0..100).map(|i| (i % 2) * 10 + i).collect::<Vec<i32>>(),
    )
    .unwrap();
    write_raster(&mut store, &checker).unwrap();

    let mut target = VecRaster::<i32, Fix<2>>::zeroed(Position::from([20, 20])).unwrap();
    let regions =
        FileMemRegions::from_file_region(Region::<Fix<2>>::whole(), Position::from([5, 5]));
    read_region_into(&store, &regions, &mut target).unwrap();

    assert_eq!(
        target[&Position::from([5, 5])],
        checker[&Position::from([0, 0])]
    );
    assert_eq!(
        target[&Position::from([14, 14])],
        checker[&Position::from([9, 9])]
    );
    assert_eq!(target[&Position::from([4, 5])], 0);
    assert_eq!(target[&Position::from([15, 14])], 0);
}

#[test]
fn test_heterogeneous_columns_roundtrip() {
    let mut store = MemTable::new(3, 2);
    store.add_column("ID", 1, vec![0_i32; 3]).unwrap();
    store.add_column("RADEC", 2, vec![0.0_f64; 6]).unwrap();
    store
        .add_column("NAME", 16, vec![String::new(), String::new(), String::new()])
        .unwrap();

    let ids = VecColumn::new(ColumnInfo::<Dyn>::new("ID", "", 1), vec![45, 7, 31]).unwrap();
    let radecs = VecColumn::new(
        ColumnInfo::<Dyn>::new("RADEC", "deg", 2),
        vec![10.5, 41.2, 83.8, -5.4, 266.4, -29.0],
    )
    .unwrap();
    let names = VecColumn::new(
        ColumnInfo::<Dyn>::new("NAME", "", 16),
        vec!["M31".to_string(), "M42".to_string(), "Sgr A*".to_string()],
    )
    .unwrap();
    write_columns(&mut store, &(&ids, &radecs, &names)).unwrap();

    let id_back = read_column::<i32, _, Dyn>(&store, ids.info().clone()).unwrap();
    let radec_back = read_column::<f64, _, Dyn>(&store, radecs.info().clone()).unwrap();
    let name_back = read_column::<String, _, Dyn>(&store, names.info().clone()).unwrap();
    assert_eq!(id_back.as_slice(), ids.as_slice());
    assert_eq!(radec_back.as_slice(), radecs.as_slice());
    assert_eq!(name_back.as_slice(), names.as_slice());
    assert_eq!(*radec_back.at(1, -1).unwrap(), -5.4);
}

#[test]
fn test_reshape_refolds_rows() {
    // A 3-row vector column refolded to 1 element per row becomes 6 rows
    // over the same buffer, and transfers accordingly.
    let mut store = MemTable::new(6, 4);
    store.add_column("V", 1, vec![0_i16; 6]).unwrap();

    let mut column =
        VecColumn::new(ColumnInfo::<Dyn>::new("V", "", 2), vec![1_i16, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(column.row_count(), 3);
    column.reshape(1).unwrap();
    assert_eq!(column.row_count(), 6);

    write_column(&mut store, &column).unwrap();
    let back = read_column::<i16, _, Dyn>(&store, column.info().clone()).unwrap();
    assert_eq!(back.as_slice(), &[1, 2, 3, 4, 5, 6]);
    assert_eq!(back.row_count(), 6);
}

#[test]
fn test_chunked_engine_call_counts() {
    const ROWS: i64 = 10_000;
    const CHUNK: i64 = 1_000;

    let mut rng = rand::rng();
    let ids: Vec<i32> = (0..ROWS as i32).collect();
    let fluxes: Vec<f64> = (0..ROWS).map(|_| rng.random::<f64>()).collect();

    let mut inner = MemTable::new(ROWS, CHUNK);
    inner.add_column("ID", 1, vec![0_i32; ROWS as usize]).unwrap();
    inner
        .add_column("FLUX", 1, vec![0.0_f64; ROWS as usize])
        .unwrap();
    let mut store = CountingTable::new(inner);

    let id_column = VecColumn::new(ColumnInfo::<Dyn>::new("ID", "", 1), ids.clone()).unwrap();
    let flux_column =
        VecColumn::new(ColumnInfo::<Dyn>::new("FLUX", "", 1), fluxes.clone()).unwrap();
    write_columns(&mut store, &(&id_column, &flux_column)).unwrap();
    // 10 chunks of 1000 rows, one bounded call per column per chunk
    assert_eq!(store.writes.get(), 20);

    let mut id_out =
        VecColumn::<i32, Dyn>::with_row_count(ColumnInfo::new("ID", "", 1), ROWS).unwrap();
    let mut flux_out =
        VecColumn::<f64, Dyn>::with_row_count(ColumnInfo::new("FLUX", "", 1), ROWS).unwrap();
    read_columns(&store, &mut (&mut id_out, &mut flux_out)).unwrap();
    assert_eq!(store.reads.get(), 20);

    assert_eq!(id_out.as_slice(), &ids[..]);
    assert_eq!(flux_out.as_slice(), &fluxes[..]);
}

#[test]
fn test_chunked_engine_partial_last_chunk() {
    // 25 rows with a chunk size of 10: two full chunks and one of 5
    let mut inner = MemTable::new(25, 10);
    inner.add_column("A", 1, (0..25_i64).collect()).unwrap();
    let store = CountingTable::new(inner);

    let mut out = VecColumn::<i64, Dyn>::with_row_count(ColumnInfo::new("A", "", 1), 25).unwrap();
    read_columns(&store, &mut out).unwrap();
    assert_eq!(store.reads.get(), 3);
    assert_eq!(out.as_slice(), &(0..25).collect::<Vec<i64>>()[..]);
}

#[test]
fn test_field_access_after_read() {
    let mut store = MemTable::new(2, 2);
    store.add_column("PIX", 6, vec![0_i32; 12]).unwrap();

    let column = VecColumn::new(
        ColumnInfo::<Dyn>::with_shape("PIX", "", Position::from_slice(&[3, 2])),
        (0..12).collect::<Vec<i32>>(),
    )
    .unwrap();
    write_column(&mut store, &column).unwrap();

    let back = read_column::<i32, _, Dyn>(&store, column.info().clone()).unwrap();
    let field = back.field(1).unwrap();
    assert_eq!(field.shape().as_slice(), &[3, 2]);
    assert_eq!(field.as_slice(), &[6, 7, 8, 9, 10, 11]);
    assert_eq!(*field.at(&Position::from_slice(&[-1, -1])).unwrap(), 11);
}
