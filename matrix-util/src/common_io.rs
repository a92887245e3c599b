use flate2::read::GzDecoder;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::tempdir;

/// Field separator of a delimited text file
pub struct Delimiter(String);

impl From<&str> for Delimiter {
    fn from(s: &str) -> Self {
        Delimiter(s.to_string())
    }
}

impl Delimiter {
    fn split<'a>(&'a self, line: &'a str) -> std::str::Split<'a, &'a str> {
        line.split(self.0.as_str())
    }
}

pub struct ReadLinesOut<T> {
    pub lines: Vec<Vec<T>>,
    pub header: Vec<Box<str>>,
}

///
/// Read every line of the input_file into memory
///
/// * `input_file` - file name--either gzipped or not
///
pub fn read_lines(input_file_path: &str) -> anyhow::Result<Vec<Box<str>>> {
    let buf: Box<dyn BufRead> = open_buf_reader(input_file_path)?;
    let mut lines = vec![];
    for x in buf.lines() {
        lines.push(x?.into_boxed_str());
    }
    Ok(lines)
}

///
/// Write every line into the output_file
///
/// * `lines` - vector of lines
/// * `output_file` - file name--either gzipped or not
///
pub fn write_lines(lines: &[Box<str>], output_file_path: &str) -> anyhow::Result<()> {
    write_types(lines, output_file_path)
}

///
/// Write every line into the output_file
///
/// * `lines` - vector of lines
/// * `output_file` - file name--either gzipped or not
///
pub fn write_types<T>(lines: &[T], output_file_path: &str) -> anyhow::Result<()>
where
    T: std::fmt::Display,
{
    let mut buf = open_buf_writer(output_file_path)?;
    for line in lines {
        if let Err(e) = writeln!(buf, "{}", line) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            } else {
                return Err(e.into());
            }
        }
    }
    buf.flush()?;
    Ok(())
}

///
/// Read lines, skipping comments (`#`, `%`), and parse each into a
/// vector of values in parallel.
///
/// * `input_file` - file name--either gzipped or not
/// * `hdr_line` - location of a header line (-1 = no header line)
/// * `parse_header_fn` - parse the header line
/// * `parse_fn` - parse a data line
///
pub fn read_lines_of_words_generic<T>(
    input_file: &str,
    hdr_line: i64,
    parse_header_fn: impl Fn(&str) -> Vec<Box<str>> + Sync,
    parse_fn: impl Fn(&str) -> anyhow::Result<Vec<T>> + Sync,
) -> anyhow::Result<ReadLinesOut<T>>
where
    T: Send,
{
    let buf_reader: Box<dyn BufRead> = open_buf_reader(input_file)?;

    fn is_not_comment_line(line: &str) -> bool {
        !(line.starts_with('#') || line.starts_with('%') || line.trim().is_empty())
    }

    let lines_raw: Vec<Box<str>> = buf_reader
        .lines()
        .map_while(Result::ok)
        .map(|x| x.into_boxed_str())
        .filter(|x| is_not_comment_line(x.as_ref()))
        .collect();

    let mut header = vec![];

    let body = if hdr_line < 0 {
        &lines_raw[..]
    } else {
        let n_skip = hdr_line as usize;
        if lines_raw.len() < (n_skip + 1) {
            return Err(anyhow::anyhow!("not enough data in {}", input_file));
        }
        header.extend(parse_header_fn(&lines_raw[n_skip]));
        &lines_raw[(n_skip + 1)..]
    };

    // Parsing takes more time, so split them into parallel jobs;
    // `collect` on an indexed iterator keeps the line order
    let lines = body
        .par_iter()
        .enumerate()
        .map(|(i, s)| {
            parse_fn(s).map_err(|e| anyhow::anyhow!("{}: data line {}: {}", input_file, i + 1, e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(ReadLinesOut { lines, header })
}

///
/// Specialized function to read lines and parse them into a vector of types.
///
/// * `input_file` - file name--either gzipped or not
/// * `delim` - delimiter
/// * `hdr_line` - location of a header line (-1 = no header line)
///
pub fn read_lines_of_types<T>(
    input_file: &str,
    delim: impl Into<Delimiter>,
    hdr_line: i64,
) -> anyhow::Result<ReadLinesOut<T>>
where
    T: Send + std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    let delim = delim.into();

    let parse_fn = |line: &str| -> anyhow::Result<Vec<T>> {
        delim
            .split(line)
            .map(|x| {
                x.trim()
                    .parse::<T>()
                    .map_err(|e| anyhow::anyhow!("failed to parse `{}`: {}", x, e))
            })
            .collect()
    };

    let parse_header_fn = |line: &str| -> Vec<Box<str>> {
        delim
            .split(line)
            .map(|x| x.trim().to_owned().into_boxed_str())
            .collect()
    };

    read_lines_of_words_generic(input_file, hdr_line, parse_header_fn, parse_fn)
}

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let ext = Path::new(input_file).extension().and_then(|x| x.to_str());
    match ext {
        Some("gz") => {
            let input_file = File::open(input_file)?;
            let decoder = GzDecoder::new(input_file);
            Ok(Box::new(BufReader::new(decoder)))
        }
        _ => {
            let input_file = File::open(input_file)?;
            Ok(Box::new(BufReader::new(input_file)))
        }
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn std::io::Write>> {
    // we can simply override with stdout
    if output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(std::io::BufWriter::new(std::io::stdout())));
    }

    if output_file.eq_ignore_ascii_case("stderr") {
        return Ok(Box::new(std::io::BufWriter::new(std::io::stderr())));
    }

    let ext = Path::new(output_file).extension().and_then(|x| x.to_str());
    match ext {
        Some("gz") => {
            let output_file = File::create(output_file)?;
            let encoder =
                flate2::write::GzEncoder::new(output_file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => {
            let output_file = File::create(output_file)?;
            Ok(Box::new(BufWriter::new(output_file)))
        }
    }
}

///
/// Create a directory if needed
/// * `file` - file name
///
pub fn mkdir(file: &str) -> anyhow::Result<()> {
    let path = Path::new(file);
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

///
/// Take the extension of a file, looking through `.gz`
/// * `file` - file name
///
pub fn extension(file: &str) -> anyhow::Result<Box<str>> {
    let path = Path::new(file);
    let path = match path.extension().and_then(|x| x.to_str()) {
        Some("gz") => Path::new(path.file_stem().ok_or(anyhow::anyhow!("no file stem"))?),
        _ => path,
    };
    let ext = path
        .extension()
        .and_then(|x| x.to_str())
        .ok_or(anyhow::anyhow!("no extension: {}", file))?;
    Ok(ext.into())
}

///
/// Create a temporary directory and suggest a file name
/// * `suffix` - suffix of the file name
///
pub fn create_temp_dir_file(suffix: &str) -> anyhow::Result<std::path::PathBuf> {
    let temp_dir = tempdir()?.path().to_path_buf();
    std::fs::create_dir_all(&temp_dir)?;
    let temp_file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile_in(temp_dir)?
        .path()
        .to_owned();

    Ok(temp_file)
}
