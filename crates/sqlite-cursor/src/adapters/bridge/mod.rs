mod handler;
mod io;
mod protocol;

use crate::cli::Args;

use handler::BridgeHandler;
use io::NdjsonIo;
use protocol::BridgeRequest;

pub fn run(args: Args) -> std::io::Result<()> {
    let mut io = NdjsonIo::stdio();
    let mut handler = BridgeHandler::new(args);
    serve(&mut io, &mut handler)?;
    handler.shutdown();
    Ok(())
}

fn serve<R: std::io::Read, W: std::io::Write>(
    io: &mut NdjsonIo<R, W>,
    handler: &mut BridgeHandler,
) -> std::io::Result<()> {
    loop {
        let Some(line) = io.read_line()? else { break };
        if line.is_empty() {
            continue;
        }

        let req: BridgeRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                // best-effort: unknown id; still return something
                let _ = io.protocol_error("".to_string(), 1, e.to_string());
                continue;
            }
        };

        let resp = handler.handle(req);
        io.write_json_line(&resp)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run_script(script: &str) -> Vec<serde_json::Value> {
        let args = Args::parse_from(["sqlite-cursor"]);
        let mut handler = BridgeHandler::new(args);
        let mut io = NdjsonIo::new(script.as_bytes(), Vec::new());
        serve(&mut io, &mut handler).unwrap();
        let out = io.into_output().unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn session_over_ndjson() {
        let script = r#"
{"v":1,"id":"1","cmd":"open","payload":{}}
{"v":1,"id":"2","cmd":"execute","payload":{"sql":"CREATE TABLE t (a TEXT, b INT)"}}
{"v":1,"id":"3","cmd":"execute","payload":{"sql":"INSERT INTO t VALUES (?, ?), (?, ?)","params":["First",1,"Second",2]}}
{"v":1,"id":"4","cmd":"query","payload":{"sql":"SELECT a FROM t WHERE b = :b","params":{"b":2}}}
{"v":1,"id":"5","cmd":"query","payload":{"sql":"SELECT * FROM missing"}}
not json
{"v":1,"id":"6","cmd":"bogus"}
"#;
        let out = run_script(script);
        assert_eq!(out.len(), 7);
        assert_eq!(out[0]["status"], "ok");
        assert_eq!(out[2]["data"]["changes"], 2);
        assert_eq!(out[3]["data"]["rows"][0]["a"], "Second");
        assert_eq!(out[4]["code"], "STATEMENT_ERROR");
        assert_eq!(out[4]["native_code"], 1);
        assert_eq!(out[5]["code"], "INVALID_REQUEST");
        assert_eq!(out[6]["code"], "INVALID_REQUEST");
    }

    #[test]
    fn transactions_over_ndjson() {
        let script = r#"
{"v":1,"id":"1","cmd":"open"}
{"v":1,"id":"2","cmd":"execute","payload":{"sql":"CREATE TABLE t (a INT)"}}
{"v":1,"id":"3","cmd":"begin"}
{"v":1,"id":"4","cmd":"execute","payload":{"sql":"INSERT INTO t VALUES (1)"}}
{"v":1,"id":"5","cmd":"rollback"}
{"v":1,"id":"6","cmd":"query","payload":{"sql":"SELECT COUNT(*) AS n FROM t"}}
{"v":1,"id":"7","cmd":"commit"}
{"v":1,"id":"8","cmd":"close"}
{"v":1,"id":"9","cmd":"query","payload":{"sql":"SELECT 1"}}
"#;
        let out = run_script(script);
        assert_eq!(out[4]["status"], "ok");
        assert_eq!(out[5]["data"]["rows"][0]["n"], 0);
        assert_eq!(out[6]["code"], "CONNECTION_ERROR");
        assert_eq!(out[7]["status"], "ok");
        assert_eq!(out[8]["code"], "NOT_OPEN");
    }
}
