use std::path::PathBuf;

use serde::de::DeserializeOwned;
use sqlite_cursor::{
    core::{limits::effective_limit, query},
    Database, DbError, DbResult,
};

use crate::cli::Args;

use super::protocol::*;

pub struct BridgeHandler {
    args: Args,
    db: Option<Database>,
}

impl BridgeHandler {
    pub fn new(args: Args) -> Self {
        let mut handler = Self { args, db: None };
        if let Some(path) = handler.args.db.clone() {
            if let Err(e) = handler.open(Some(path.clone())) {
                tracing::error!(error = %e, path = %path.display(), "failed to open startup database");
            }
        }
        handler
    }

    pub fn handle(&mut self, req: BridgeRequest) -> BridgeResponse<serde_json::Value> {
        if req.v != 1 {
            return BridgeResponse::err(
                req.v,
                req.id,
                "INVALID_REQUEST",
                format!("unsupported protocol version: {}", req.v),
            );
        }

        let result = match req.cmd.as_str() {
            "open" => self.handle_open(&req),
            "close" => self.handle_close(),
            "begin" => ack(self.db().and_then(|db| db.start_transaction())),
            "commit" => ack(self.db().and_then(|db| db.commit())),
            "rollback" => ack(self.db().and_then(|db| db.rollback())),
            "execute" => self.handle_execute(&req),
            "query" => self.handle_query(&req),
            other => {
                return BridgeResponse::err(
                    req.v,
                    req.id,
                    "INVALID_REQUEST",
                    format!("unknown cmd: {other}"),
                )
            }
        };

        match result {
            Ok(Ok(data)) => BridgeResponse::ok(req.v, req.id, data),
            Ok(Err(invalid)) => BridgeResponse::err(req.v, req.id, "INVALID_REQUEST", invalid),
            Err(e) => err(req, e),
        }
    }

    /// Closes the active database; failures are only logged.
    pub fn shutdown(&mut self) {
        if let Some(mut db) = self.db.take() {
            if let Err(e) = db.close() {
                tracing::warn!(error = %e, "failed to close database on shutdown");
            }
        }
    }

    fn handle_open(&mut self, req: &BridgeRequest) -> Outcome {
        let p: OpenPayload = match payload_or_default(req) {
            Ok(p) => p,
            Err(invalid) => return Ok(Err(invalid)),
        };
        ack(self.open(p.path.map(PathBuf::from)))
    }

    fn open(&mut self, path: Option<PathBuf>) -> DbResult<bool> {
        // Replacing the active database closes the previous one first.
        if let Some(mut old) = self.db.take() {
            if let Err(e) = old.close() {
                self.db = Some(old);
                return Err(e);
            }
        }
        let mut db = Database::with_options(path, self.args.open_options());
        db.open()?;
        self.db = Some(db);
        Ok(true)
    }

    fn handle_close(&mut self) -> Outcome {
        match self.db.as_mut() {
            Some(db) => ack(db.close()),
            None => Ok(Ok(serde_json::Value::Bool(true))),
        }
    }

    fn handle_execute(&mut self, req: &BridgeRequest) -> Outcome {
        let p: ExecutePayload = match payload(req) {
            Ok(p) => p,
            Err(invalid) => return Ok(Err(invalid)),
        };
        let db = self.db()?;
        let params = query::params_from_json(p.params)?;
        let er = query::run_execute(db, &p.sql, params)?;
        Ok(Ok(serde_json::to_value(er).unwrap_or(serde_json::Value::Null)))
    }

    fn handle_query(&mut self, req: &BridgeRequest) -> Outcome {
        let p: QueryPayload = match payload(req) {
            Ok(p) => p,
            Err(invalid) => return Ok(Err(invalid)),
        };
        let db = self.db()?;
        let params = query::params_from_json(p.params)?;
        let limits = effective_limit(p.limit, self.args.max_rows);
        let qr = query::run_query(db, &p.sql, params, limits.max_rows, p.offset)?;
        Ok(Ok(serde_json::to_value(qr).unwrap_or(serde_json::Value::Null)))
    }

    fn db(&self) -> DbResult<&Database> {
        self.db.as_ref().ok_or(DbError::NotOpen)
    }
}

/// Outer error: the database refused. Inner error: the request was malformed.
type Outcome = DbResult<Result<serde_json::Value, String>>;

fn ack(r: DbResult<bool>) -> Outcome {
    r.map(|b| Ok(serde_json::Value::Bool(b)))
}

fn payload<T: DeserializeOwned>(req: &BridgeRequest) -> Result<T, String> {
    serde_json::from_value(req.payload.clone()).map_err(|e| e.to_string())
}

fn payload_or_default<T: DeserializeOwned + Default>(req: &BridgeRequest) -> Result<T, String> {
    if req.payload.is_null() {
        Ok(T::default())
    } else {
        payload(req)
    }
}

fn err(req: BridgeRequest, e: DbError) -> BridgeResponse<serde_json::Value> {
    let mut resp = BridgeResponse::err(req.v, req.id, e.code(), e.to_string());
    resp.native_code = e.native_code();
    resp
}
