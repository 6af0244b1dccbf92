use std::io::{self, Write};

pub fn println(message: &str, writer: &mut Option<&mut (dyn Write + Send)>) -> io::Result<()> {
    if let Err(e) = writeln!(io::stdout(), "{message}") {
        tracing::warn!("failed to write to stdout: {e}");
    }

    if let Some(w) = writer {
        writeln!(w, "{message}")?;
    }

    Ok(())
}

pub fn eprintln(message: &str, writer: &mut Option<&mut (dyn Write + Send)>) -> io::Result<()> {
    if let Err(e) = writeln!(io::stderr(), "{message}") {
        tracing::warn!("failed to write to stderr: {e}");
    }

    if let Some(w) = writer {
        writeln!(w, "{message}")?;
    }

    Ok(())
}
