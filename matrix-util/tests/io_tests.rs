use matrix_util::common_io::{create_temp_dir_file, write_lines};
use matrix_util::traits::{IoOps, SampleOps};

#[test]
fn dmatrix_io_test() -> anyhow::Result<()> {
    let xx = nalgebra::DMatrix::<f32>::runif(50, 50);

    let tsv_file = create_temp_dir_file("txt.gz")?;
    xx.to_tsv(tsv_file.to_str().unwrap())?;

    let yy = nalgebra::DMatrix::<f32>::read_file_delim(tsv_file.to_str().unwrap(), "\t", None)?;

    approx::assert_abs_diff_eq!(xx, yy);

    Ok(())
}

#[test]
fn dmatrix_header_test() -> anyhow::Result<()> {
    let csv_file = create_temp_dir_file("csv")?;
    let csv_file = csv_file.to_str().unwrap();

    let lines: Vec<Box<str>> = vec![
        "# comment lines are skipped".into(),
        "g0,g1,g2".into(),
        "1,2,3".into(),
        "4.5,0,1e-2".into(),
    ];
    write_lines(&lines, csv_file)?;

    let (names, xx) = nalgebra::DMatrix::<f32>::read_file_delim_with_header(csv_file, ",")?;

    assert_eq!(names, vec!["g0".into(), "g1".into(), "g2".into()] as Vec<Box<str>>);
    assert_eq!(xx.nrows(), 2);
    assert_eq!(xx.ncols(), 3);
    assert_eq!(xx[(1, 0)], 4.5);
    assert_eq!(xx[(1, 2)], 0.01);

    Ok(())
}

#[test]
fn ragged_rows_are_rejected() -> anyhow::Result<()> {
    let tsv_file = create_temp_dir_file("tsv")?;
    let tsv_file = tsv_file.to_str().unwrap();

    let lines: Vec<Box<str>> = vec!["1\t2\t3".into(), "4\t5".into()];
    write_lines(&lines, tsv_file)?;

    assert!(nalgebra::DMatrix::<f32>::read_file_delim(tsv_file, "\t", None).is_err());
    Ok(())
}

#[test]
fn unparsable_field_is_an_error() -> anyhow::Result<()> {
    let tsv_file = create_temp_dir_file("tsv")?;
    let tsv_file = tsv_file.to_str().unwrap();

    let lines: Vec<Box<str>> = vec!["1\t2".into(), "4\tNA?".into()];
    write_lines(&lines, tsv_file)?;

    assert!(nalgebra::DMatrix::<f32>::read_file_delim(tsv_file, "\t", None).is_err());
    Ok(())
}

#[test]
fn header_is_written_first() -> anyhow::Result<()> {
    let tsv_file = create_temp_dir_file("tsv.gz")?;
    let tsv_file = tsv_file.to_str().unwrap();

    let xx = nalgebra::DMatrix::<f32>::from_row_slice(2, 2, &[1.0, 0.5, -2.0, 3.25]);
    let names: Vec<Box<str>> = vec!["a".into(), "b".into()];
    xx.write_file_delim_with_header(tsv_file, &names, "\t")?;

    let (hdr, yy) = nalgebra::DMatrix::<f32>::read_file_delim_with_header(tsv_file, "\t")?;
    assert_eq!(hdr, names);
    assert_eq!(xx, yy);

    let short: Vec<Box<str>> = vec!["a".into()];
    assert!(xx.write_file_delim_with_header(tsv_file, &short, "\t").is_err());
    Ok(())
}
