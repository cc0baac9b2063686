//! Round-trip a small catalog through the in-memory table store.
//!
//! Run with: cargo run --example table_roundtrip

use fitsdata::{
    read_columns, write_columns, ColumnInfo, Dyn, MemTable, Position, Result, VecColumn,
};

fn main() -> Result<()> {
    // A table of 4 sources with a preferred chunk of 2 rows
    let mut store = MemTable::new(4, 2);
    store.add_column("ID", 1, vec![0_i32; 4])?;
    store.add_column("RADEC", 2, vec![0.0_f64; 8])?;
    store.add_column("NAME", 16, vec![String::new(); 4])?;

    let ids = VecColumn::new(ColumnInfo::<Dyn>::new("ID", "", 1), vec![45, 7, 31, 1])?;
    let radecs = VecColumn::new(
        ColumnInfo::<Dyn>::new("RADEC", "deg", 2),
        vec![10.7, 41.3, 83.8, -5.4, 266.4, -29.0, 201.4, -47.5],
    )?;
    let names = VecColumn::new(
        ColumnInfo::<Dyn>::new("NAME", "", 16),
        vec![
            "M31".to_string(),
            "M42".to_string(),
            "Sgr A*".to_string(),
            "Cen A".to_string(),
        ],
    )?;

    println!("Writing {} rows in chunks of 2...", ids.row_count());
    write_columns(&mut store, &(&ids, &radecs, &names))?;

    let mut id_out = VecColumn::<i32, Dyn>::with_row_count(ColumnInfo::new("ID", "", 1), 4)?;
    let mut radec_out =
        VecColumn::<f64, Dyn>::with_row_count(ColumnInfo::new("RADEC", "deg", 2), 4)?;
    let mut name_out =
        VecColumn::<String, Dyn>::with_row_count(ColumnInfo::new("NAME", "", 16), 4)?;
    read_columns(&store, &mut (&mut id_out, &mut radec_out, &mut name_out))?;

    println!("Read back:");
    for row in 0..id_out.row_count() {
        let field = radec_out.field(row)?;
        println!(
            "  #{:<3} {:10} ra={:7.2} dec={:7.2}",
            id_out.at(row, 0)?,
            name_out.at(row, 0)?,
            field[&Position::from_slice(&[0])],
            field[&Position::from_slice(&[1])],
        );
    }

    Ok(())
}
