use crate::buffer::OutboundBuffer;
use crate::error::Result;
use crate::template::FormatTemplate;
use std::sync::Arc;

/// Spawns the ingestion task: reads `reader` line by line, renders each line
/// through `template` and pushes the result into `buffer`.
///
/// The task is strictly sequential, so records enter the buffer in file order.
/// Line terminators (`\n` or `\r\n`) are stripped and invalid UTF-8 is
/// replaced lossily. Line length is not limited; `capacity` only sizes the
/// read buffer.
///
/// # Returns
/// A `JoinHandle` that resolves to the number of records pushed once the
/// reader hits EOF. Awaiting it is the completion signal for the load
/// pipeline.
///
/// # Errors
/// Any read error other than EOF ends the task with [`Error::Io`]. Pushing
/// into a closed buffer ends it with [`Error::Closed`].
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use sqsutils::{spawn_reader, FormatTemplate, OutboundBuffer};
///
/// async fn example() -> sqsutils::Result<()> {
///     let buffer = Arc::new(OutboundBuffer::new());
///     let file = tokio::fs::File::open("records.txt").await?;
///     let handle = spawn_reader(file, 256 * 1024, FormatTemplate::default(), buffer.clone());
///
///     let read = handle.await??;
///     println!("buffered {read} records");
///     Ok(())
/// }
/// ```
///
/// [`Error::Io`]: crate::Error::Io
/// [`Error::Closed`]: crate::Error::Closed
pub fn spawn_reader<R: tokio::io::AsyncRead + Unpin + Send + 'static>(
    reader: R,
    capacity: usize,
    template: FormatTemplate,
    buffer: Arc<OutboundBuffer>,
) -> tokio::task::JoinHandle<Result<u64>> {
    tokio::spawn(read_lines(
        tokio::io::BufReader::with_capacity(capacity, reader),
        template,
        buffer,
    ))
}

async fn read_lines<R: tokio::io::AsyncBufRead + Unpin>(
    mut reader: R,
    template: FormatTemplate,
    buffer: Arc<OutboundBuffer>,
) -> Result<u64> {
    use tokio::io::AsyncBufReadExt;

    let mut line = Vec::new();
    let mut read = 0u64;

    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).await.map_err(|e| {
            log::error!("I/O error while reading lines after {read} records: {e}");
            e
        })?;

        // Clean EOF
        if n == 0 {
            log::debug!("reached EOF after {read} records");
            return Ok(read);
        }

        buffer.push(template.render(&String::from_utf8_lossy(trim_newline(&line))))?;
        read += 1;
    }
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
