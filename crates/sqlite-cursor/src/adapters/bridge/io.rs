use std::io::{BufRead, BufReader, BufWriter, Read, Write};

/// Newline-delimited JSON over a reader/writer pair (stdio in production).
pub struct NdjsonIo<R, W: Write> {
    input: BufReader<R>,
    output: BufWriter<W>,
}

impl NdjsonIo<std::io::Stdin, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin(), std::io::stdout())
    }
}

impl<R: Read, W: Write> NdjsonIo<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: BufReader::new(input),
            output: BufWriter::new(output),
        }
    }

    /// `None` at end of input; blank lines come back empty.
    pub fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let n = self.input.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(&['\r', '\n'][..]).to_string();
        if line.trim().is_empty() {
            return Ok(Some(String::new()));
        }
        Ok(Some(line))
    }

    pub fn write_json_line<T: serde::Serialize>(&mut self, v: &T) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.output, v)?;
        self.output.write_all(b"\n")?;
        self.output.flush()
    }

    pub fn protocol_error(&mut self, id: String, v: u32, msg: String) -> std::io::Result<()> {
        #[derive(serde::Serialize)]
        struct ErrResp<'a> {
            v: u32,
            id: &'a str,
            status: &'static str,
            error: String,
            code: &'static str,
        }
        let r = ErrResp {
            v,
            id: &id,
            status: "error",
            error: msg,
            code: "INVALID_REQUEST",
        };
        self.write_json_line(&r)
    }

    #[cfg(test)]
    pub fn into_output(self) -> std::io::Result<W> {
        self.output.into_inner().map_err(|e| e.into_error())
    }
}
