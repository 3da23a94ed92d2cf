use std::fs::File;
use std::io;
use std::io::{BufRead, Write};
use std::net::TcpStream;
use std::path::PathBuf;

use checked_print::{CheckedWriter, Config, Print, PrintWriter};
use clap::Parser;

/// Copies stdin line by line to a file, a TCP peer or stdout, failing once the
/// output is found broken.
#[derive(Parser, Debug)]
#[clap(name = "checked-pipe", version)]
struct Args {
    /// Number of lines written between error checks
    #[clap(long, default_value_t = checked_print::DEFAULT_FLUSH_INTERVAL)]
    flush_interval: u64,

    /// Error message, `%s` is replaced with the failing line number
    #[clap(long, default_value = checked_print::DEFAULT_MESSAGE_TEMPLATE)]
    message: String,

    /// Flush after every line
    #[clap(long)]
    auto_flush: bool,

    /// Write to this file
    #[clap(long, conflicts_with = "connect")]
    output: Option<PathBuf>,

    /// Write to this TCP address
    #[clap(long)]
    connect: Option<String>,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            flush_interval: self.flush_interval,
            message_template: self.message.clone(),
        }
    }

    fn open_sink(&self) -> io::Result<Box<dyn Write>> {
        Ok(match (&self.output, &self.connect) {
            (Some(path), _) => Box::new(File::create(path)?),
            (None, Some(addr)) => Box::new(TcpStream::connect(addr.as_str())?),
            (None, None) => Box::new(io::stdout()),
        })
    }
}

fn main() -> io::Result<()> {
    pretty_env_logger::init();

    let args = Args::parse();
    let sink = args.open_sink()?;
    let mut writer = CheckedWriter::with_config(
        PrintWriter::with_auto_flush(sink, args.auto_flush),
        args.config(),
    )?;

    let result = handle(io::stdin().lock(), &mut writer);
    writer.close();

    match result {
        Ok(lines) => log::debug!("copied {} lines", lines),
        Err(e) => {
            log::error!("failed to copy input: {}", e);
            return Err(e);
        }
    }

    Ok(())
}

fn handle<R: BufRead, P: Print>(input: R, writer: &mut CheckedWriter<P>) -> io::Result<u64> {
    let mut lines = 0;

    for line in input.lines() {
        writer.println_value(&line?)?;
        lines += 1;
    }

    // failures after the last checkpoint only show up here
    if writer.check_error() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("output failed after {} lines", lines),
        ));
    }

    Ok(lines)
}
