use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{StreamExt, stream};
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tokio_postgres::error::DbError;
use tokio_postgres::types::ToSql;
use tokio_postgres::{AsyncMessage, Client, NoTls, Statement};

use crate::driver::{Command, Driver};
use crate::error::SqlSessionError;
use crate::messages::{MessageSink, ServerMessage, Severity};
use crate::parameter::ParameterSet;
use crate::results::RowReader;
use crate::types::Value;

use super::config::PostgresOptions;
use super::params::{PgStatement, build_statement, ordered_values};
use super::query::{ColumnLayout, PgRowReader, postgres_extract_value};

/// How long `close` waits for the connection task to say goodbye to the server.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Token for the transaction begun on a [`PostgresDriver`].
#[derive(Debug)]
pub struct PostgresTransaction {
    id: u64,
}

struct Link {
    client: Client,
    task: JoinHandle<()>,
}

/// [`Driver`] over one `tokio_postgres` client, blocking on a private current-thread runtime.
///
/// The connection task forwards server notices to the session's [`MessageSink`]; it runs
/// whenever the driver (or a row reader) is blocked on the runtime.
pub struct PostgresDriver {
    options: PostgresOptions,
    messages: MessageSink,
    runtime: Option<Arc<Runtime>>,
    link: Option<Link>,
    next_transaction: u64,
}

impl PostgresDriver {
    #[must_use]
    pub fn new(options: PostgresOptions, messages: MessageSink) -> Self {
        Self {
            options,
            messages,
            runtime: None,
            link: None,
            next_transaction: 1,
        }
    }

    fn runtime(&mut self) -> Result<Arc<Runtime>, SqlSessionError> {
        if let Some(runtime) = &self.runtime {
            return Ok(Arc::clone(runtime));
        }
        let runtime = Arc::new(Builder::new_current_thread().enable_all().build()?);
        self.runtime = Some(Arc::clone(&runtime));
        Ok(runtime)
    }

    fn parts(&self) -> Result<(&Runtime, &Client), SqlSessionError> {
        match (&self.runtime, &self.link) {
            (Some(runtime), Some(link)) => Ok((runtime, &link.client)),
            _ => Err(SqlSessionError::ConnectionError(
                "Postgres connection is not open".into(),
            )),
        }
    }

    fn client(&self) -> Result<&Client, SqlSessionError> {
        self.parts().map(|(_, client)| client)
    }

    /// Block on `work`, cancelling it on the server when `timeout` elapses first.
    fn block<T>(
        &self,
        timeout: Option<Duration>,
        work: impl Future<Output = Result<T, tokio_postgres::Error>>,
    ) -> Result<T, SqlSessionError> {
        let (runtime, client) = self.parts()?;
        let result = match timeout {
            None => runtime.block_on(work),
            Some(limit) => match runtime.block_on(tokio::time::timeout(limit, work)) {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!(?limit, "statement timed out; cancelling");
                    let token = client.cancel_token();
                    if let Err(err) = runtime.block_on(token.cancel_query(NoTls)) {
                        tracing::warn!("cancelling timed out statement failed: {err}");
                    }
                    return Err(SqlSessionError::Timeout(limit));
                }
            },
        };
        result.map_err(|err| self.report(err))
    }

    /// Server errors also go to the error stream of the message sink.
    fn report(&self, err: tokio_postgres::Error) -> SqlSessionError {
        if let Some(db_error) = err.as_db_error() {
            self.messages.deliver(&server_message(db_error));
        }
        err.into()
    }

    fn prepare(&self, statement: &PgStatement) -> Result<Statement, SqlSessionError> {
        tracing::trace!(sql = %statement.sql, "prepare");
        let client = self.client()?;
        self.block(None, async {
            match &statement.types {
                Some(types) => client.prepare_typed(&statement.sql, types).await,
                None => client.prepare(&statement.sql).await,
            }
        })
    }

    fn simple(&self, sql: &str, timeout: Option<Duration>) -> Result<(), SqlSessionError> {
        let client = self.client()?;
        self.block(timeout, client.batch_execute(sql))
    }
}

fn server_message(db_error: &DbError) -> ServerMessage {
    ServerMessage::new(
        Severity::from_keyword(db_error.severity()),
        db_error.code().code(),
        db_error.message(),
    )
}

fn as_params<'a>(values: &'a [&'a Value]) -> Vec<&'a (dyn ToSql + Sync)> {
    values.iter().map(|v| *v as &(dyn ToSql + Sync)).collect()
}

impl Driver for PostgresDriver {
    type Transaction = PostgresTransaction;

    fn open(&mut self) -> Result<(), SqlSessionError> {
        let runtime = self.runtime()?;
        let (client, mut connection) = runtime.block_on(self.options.config.connect(NoTls))?;

        let messages = Arc::clone(&self.messages);
        let task = runtime.spawn(async move {
            let mut incoming = stream::poll_fn(move |cx| connection.poll_message(cx));
            while let Some(message) = incoming.next().await {
                match message {
                    Ok(AsyncMessage::Notice(notice)) => messages.deliver(&server_message(&notice)),
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!("Postgres connection error: {err}");
                        break;
                    }
                }
            }
        });

        tracing::debug!(dbname = ?self.options.config.get_dbname(), "Postgres connection opened");
        self.link = Some(Link { client, task });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.link.as_ref().is_some_and(|link| !link.client.is_closed())
    }

    fn begin(&mut self) -> Result<PostgresTransaction, SqlSessionError> {
        self.simple("BEGIN", None)?;
        let transaction = PostgresTransaction {
            id: self.next_transaction,
        };
        self.next_transaction += 1;
        tracing::trace!(id = transaction.id, "BEGIN");
        Ok(transaction)
    }

    fn commit(&mut self, transaction: PostgresTransaction) -> Result<(), SqlSessionError> {
        tracing::trace!(id = transaction.id, "COMMIT");
        self.simple("COMMIT", None)
    }

    fn rollback(&mut self, transaction: PostgresTransaction) -> Result<(), SqlSessionError> {
        tracing::trace!(id = transaction.id, "ROLLBACK");
        self.simple("ROLLBACK", None)
    }

    fn execute(
        &mut self,
        command: &Command<'_>,
        _transaction: Option<&PostgresTransaction>,
    ) -> Result<u64, SqlSessionError> {
        let statement = build_statement(command.sql, command.kind, command.parameters)?;
        if statement.names.is_empty() {
            // Simple query protocol, so multi-statement scripts work.
            self.simple(&statement.sql, command.timeout)?;
            return Ok(0);
        }
        let prepared = self.prepare(&statement)?;
        let values = ordered_values(&statement, command.parameters)?;
        let params = as_params(&values);
        let client = self.client()?;
        self.block(command.timeout, client.execute(&prepared, &params))
    }

    fn execute_many(
        &mut self,
        command: &Command<'_>,
        parameter_sets: &[ParameterSet],
        _transaction: Option<&PostgresTransaction>,
    ) -> Result<(), SqlSessionError> {
        let Some(first) = parameter_sets.first() else {
            return Ok(());
        };
        let statement = build_statement(command.sql, command.kind, Some(first))?;
        let prepared = self.prepare(&statement)?;
        let client = self.client()?;
        for parameters in parameter_sets {
            let values = ordered_values(&statement, Some(parameters))?;
            let params = as_params(&values);
            self.block(command.timeout, client.execute(&prepared, &params))?;
        }
        Ok(())
    }

    fn query(&mut self, command: &Command<'_>) -> Result<Box<dyn RowReader>, SqlSessionError> {
        let statement = build_statement(command.sql, command.kind, command.parameters)?;
        let prepared = self.prepare(&statement)?;
        let values = ordered_values(&statement, command.parameters)?;
        let layout = ColumnLayout::new(prepared.columns());
        let stream = {
            let client = self.client()?;
            self.block(command.timeout, client.query_raw(&prepared, values.iter()))?
        };
        let runtime = self.runtime()?;
        Ok(Box::new(PgRowReader::new(runtime, stream, layout)))
    }

    fn scalar(&mut self, command: &Command<'_>) -> Result<Option<Value>, SqlSessionError> {
        let statement = build_statement(command.sql, command.kind, command.parameters)?;
        let prepared = self.prepare(&statement)?;
        let values = ordered_values(&statement, command.parameters)?;
        let client = self.client()?;
        let row = self.block(command.timeout, async {
            let stream = client.query_raw(&prepared, values.iter()).await?;
            let mut stream = Box::pin(stream);
            stream.next().await.transpose()
        })?;
        match row {
            Some(row) if !row.is_empty() => postgres_extract_value(&row, 0).map(Some),
            _ => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), SqlSessionError> {
        let Some(Link { client, task }) = self.link.take() else {
            return Ok(());
        };
        // Dropping the client lets the connection task send Terminate and finish.
        drop(client);
        if let Some(runtime) = &self.runtime
            && runtime
                .block_on(async { tokio::time::timeout(CLOSE_GRACE, task).await })
                .is_err()
        {
            tracing::warn!("Postgres connection task did not finish within {CLOSE_GRACE:?}");
        }
        tracing::debug!("Postgres connection closed");
        Ok(())
    }
}
