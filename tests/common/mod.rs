//! In-memory doubles for the connection and driver seams.
//!
//! `FakeFactory`/`FakeConnection` stand in for a whole connection behind a `Session`;
//! `FakeDriver` stands in for a physical connection behind a real `DbConnection`.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sql_session::driver::{Command, Driver};
use sql_session::prelude::*;
use sql_session::results::{BufferedRows, RowReader};

/// One statement seen by a fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub verb: &'static str,
    pub sql: String,
    pub kind: CommandKind,
}

impl Call {
    pub fn new(verb: &'static str, sql: &str, kind: CommandKind) -> Self {
        Self {
            verb,
            sql: sql.to_string(),
            kind,
        }
    }
}

/// State shared by a `FakeFactory` and every connection it creates.
#[derive(Default)]
pub struct Probe {
    pub creates: AtomicUsize,
    pub disposes: AtomicUsize,
    pub calls: Mutex<Vec<Call>>,
    pub rows: Mutex<Vec<ValueSet>>,
    pub scalar: Mutex<Option<Value>>,
    pub timeouts: Mutex<Vec<Option<Duration>>>,
    pub sink: Mutex<Option<MessageSink>>,
}

impl Probe {
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn disposes(&self) -> usize {
        self.disposes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct FakeConnection {
    probe: Arc<Probe>,
}

impl Connection for FakeConnection {
    fn select(&self, sql: &str, _parameters: Option<&ParameterSet>) -> Result<Rows, SqlSessionError> {
        self.probe.record(Call::new("select", sql, CommandKind::Text));
        Ok(Rows::from_rows(self.probe.rows.lock().unwrap().clone()))
    }

    fn execute(
        &self,
        sql: &str,
        _parameters: Option<&ParameterSet>,
        kind: CommandKind,
        timeout: Option<Duration>,
    ) -> Result<(), SqlSessionError> {
        self.probe.record(Call::new("execute", sql, kind));
        self.probe.timeouts.lock().unwrap().push(timeout);
        Ok(())
    }

    fn execute_batch(
        &self,
        sql: &str,
        _parameter_sets: &[ParameterSet],
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        self.probe.record(Call::new("execute_batch", sql, kind));
        Ok(())
    }

    fn execute_on_transaction(
        &self,
        sql: &str,
        _parameters: Option<&ParameterSet>,
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        self.probe.record(Call::new("execute_on_transaction", sql, kind));
        Ok(())
    }

    fn execute_batch_on_transaction(
        &self,
        sql: &str,
        _parameter_sets: &[ParameterSet],
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        self.probe
            .record(Call::new("execute_batch_on_transaction", sql, kind));
        Ok(())
    }

    fn get_scalar(
        &self,
        sql: &str,
        _parameters: Option<&ParameterSet>,
    ) -> Result<Option<Value>, SqlSessionError> {
        self.probe.record(Call::new("get_scalar", sql, CommandKind::Text));
        Ok(self.probe.scalar.lock().unwrap().clone())
    }

    fn commit(&self) -> Result<(), SqlSessionError> {
        self.probe.record(Call::new("commit", "", CommandKind::Text));
        Ok(())
    }

    fn rollback(&self) -> Result<(), SqlSessionError> {
        self.probe.record(Call::new("rollback", "", CommandKind::Text));
        Ok(())
    }

    fn dispose(&self) {
        self.probe.disposes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    pub probe: Arc<Probe>,
}

impl FakeFactory {
    pub fn new() -> (Self, Arc<Probe>) {
        let factory = Self::default();
        let probe = Arc::clone(&factory.probe);
        (factory, probe)
    }
}

impl ConnectionFactory for FakeFactory {
    fn create(
        &self,
        _connection_string: &str,
        messages: MessageSink,
    ) -> Result<Box<dyn Connection>, SqlSessionError> {
        self.probe.creates.fetch_add(1, Ordering::SeqCst);
        *self.probe.sink.lock().unwrap() = Some(messages);
        Ok(Box::new(FakeConnection {
            probe: Arc::clone(&self.probe),
        }))
    }
}

/// Everything a `FakeDriver` did, plus the failures it has been told to produce.
#[derive(Default)]
pub struct DriverLog {
    pub opens: usize,
    pub closes: usize,
    pub begun: Vec<u32>,
    pub committed: Vec<u32>,
    pub rolled_back: Vec<u32>,
    /// Every statement run, with the transaction it ran on.
    pub executed: Vec<(String, Option<u32>)>,
    pub rows: Vec<ValueSet>,
    pub scalar: Option<Value>,
    /// Fail any statement bound to a set whose `Id` equals this value.
    pub fail_on_id: Option<i64>,
    pub fail_rollback: bool,
    /// Drop the link after the next executed statement, as a lost server would.
    pub drop_link: bool,
}

pub struct FakeDriver {
    log: Arc<Mutex<DriverLog>>,
    open: bool,
    next_transaction: u32,
}

impl FakeDriver {
    pub fn new() -> (Self, Arc<Mutex<DriverLog>>) {
        let log = Arc::new(Mutex::new(DriverLog::default()));
        let driver = Self {
            log: Arc::clone(&log),
            open: false,
            next_transaction: 1,
        };
        (driver, log)
    }

    fn run(&self, command: &Command<'_>, transaction: Option<&u32>) -> Result<(), SqlSessionError> {
        let mut log = self.log.lock().unwrap();
        let id = command
            .parameters
            .and_then(|p| p.get("Id"))
            .and_then(|p| p.value().as_int().copied());
        if id.is_some() && id == log.fail_on_id {
            return Err(SqlSessionError::ExecutionError(format!(
                "duplicate key {}",
                id.unwrap_or_default()
            )));
        }
        log.executed
            .push((command.sql.to_string(), transaction.copied()));
        Ok(())
    }
}

impl Driver for FakeDriver {
    type Transaction = u32;

    fn open(&mut self) -> Result<(), SqlSessionError> {
        self.log.lock().unwrap().opens += 1;
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn begin(&mut self) -> Result<u32, SqlSessionError> {
        let id = self.next_transaction;
        self.next_transaction += 1;
        self.log.lock().unwrap().begun.push(id);
        Ok(id)
    }

    fn commit(&mut self, transaction: u32) -> Result<(), SqlSessionError> {
        self.log.lock().unwrap().committed.push(transaction);
        Ok(())
    }

    fn rollback(&mut self, transaction: u32) -> Result<(), SqlSessionError> {
        let mut log = self.log.lock().unwrap();
        log.rolled_back.push(transaction);
        if log.fail_rollback {
            return Err(SqlSessionError::ConnectionError("link lost".into()));
        }
        Ok(())
    }

    fn execute(
        &mut self,
        command: &Command<'_>,
        transaction: Option<&u32>,
    ) -> Result<u64, SqlSessionError> {
        self.run(command, transaction)?;
        let mut log = self.log.lock().unwrap();
        if std::mem::take(&mut log.drop_link) {
            self.open = false;
        }
        Ok(1)
    }

    fn execute_many(
        &mut self,
        command: &Command<'_>,
        parameter_sets: &[ParameterSet],
        transaction: Option<&u32>,
    ) -> Result<(), SqlSessionError> {
        for parameters in parameter_sets {
            self.run(&command.rebind(parameters), transaction)?;
        }
        Ok(())
    }

    fn query(&mut self, command: &Command<'_>) -> Result<Box<dyn RowReader>, SqlSessionError> {
        self.run(command, None)?;
        let rows = self.log.lock().unwrap().rows.clone();
        Ok(Box::new(BufferedRows::new(rows)))
    }

    fn scalar(&mut self, command: &Command<'_>) -> Result<Option<Value>, SqlSessionError> {
        self.run(command, None)?;
        Ok(self.log.lock().unwrap().scalar.clone())
    }

    fn close(&mut self) -> Result<(), SqlSessionError> {
        self.log.lock().unwrap().closes += 1;
        self.open = false;
        Ok(())
    }
}
