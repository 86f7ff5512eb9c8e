//! Picks one device out of a directory, asking the operator when the choice is ambiguous.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::{DeviceDescriptor, DeviceDirectory, Error, Result};

// minimum widths of the description and serial columns
const MIN_DESCRIPTION: usize = 11;
const MIN_SERIAL: usize = 6;

/// Returns the directory index of the device to use.
///
/// A single match is chosen without any output. With several, the table is written to `output`
/// and `input` is read line by line until it yields a number in `1..=N`. Running out of input
/// fails with [`Error::SelectionAborted`].
pub fn resolve<R: BufRead, W: Write>(
    directory: &DeviceDirectory,
    mut input: R,
    mut output: W,
) -> Result<usize> {
    match directory.len() {
        0 => Err(Error::NoMatch),
        1 => Ok(0),
        n => {
            write_table(directory, &mut output)?;
            let mut line = String::new();
            loop {
                write!(output, "\nSelection>")?;
                output.flush()?;

                line.clear();
                if input.read_line(&mut line)? == 0 {
                    return Err(Error::SelectionAborted);
                }
                match line.trim().parse::<usize>() {
                    Ok(choice) if (1..=n).contains(&choice) => return Ok(choice - 1),
                    _ => log::debug!("rejected selection {:?}", line.trim()),
                }
            }
        }
    }
}

/// Writes the numbered device listing.
///
/// ```text
/// Id |      Description      | Serial
/// -------------------------------------
///  1 | Orbtrace probe-A      | AA11
///  2 | Orbtrace probe-B      | BB22
/// ```
pub fn write_table<W: Write>(directory: &DeviceDirectory, mut output: W) -> std::io::Result<()> {
    let desc_width = directory
        .iter()
        .map(|d| {
            let name = d.manufacturer().width() + d.product().width();
            name.max(MIN_DESCRIPTION) + d.serial().width().max(MIN_SERIAL)
        })
        .max()
        .unwrap_or(MIN_DESCRIPTION + MIN_SERIAL)
        + 1;

    writeln!(
        output,
        "Id | {:left$}Description{:right$} | Serial",
        "",
        "",
        left = (desc_width + 1) / 2 - 6,
        right = desc_width / 2 - 6
    )?;
    writeln!(output, "{}", "-".repeat(desc_width + 15))?;

    for (i, d) in directory.iter().enumerate() {
        let name_width = d.manufacturer().width() + d.product().width() + 1;
        writeln!(
            output,
            "{:2} | {} {}{:pad$}| {}",
            i + 1,
            d.manufacturer(),
            d.product(),
            "",
            d.serial(),
            pad = desc_width.saturating_sub(name_width)
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct ListEntry<'a> {
    index: usize,
    #[serde(flatten)]
    device: &'a DeviceDescriptor,
}

/// Writes the listing as a JSON array, numbered the same way as [`write_table`].
pub fn write_json<W: Write>(directory: &DeviceDirectory, mut output: W) -> io::Result<()> {
    let entries: Vec<ListEntry> = directory
        .iter()
        .enumerate()
        .map(|(i, device)| ListEntry {
            index: i + 1,
            device,
        })
        .collect();
    serde_json::to_writer_pretty(&mut output, &entries)?;
    writeln!(output)
}
