use crate::Session;

use formwork_core::{
    gateway::{CursorId, Fetch, Operation, Request},
    Result, Statement, Value,
};

/// Backend cursor state shared by the gateway-backed sources.
///
/// End of data is detected from a batch shorter than the fetch size, so a
/// result whose size is an exact multiple of the fetch size costs one
/// extra, empty round trip.
#[derive(Debug)]
pub(crate) struct Cursor {
    id: Option<CursorId>,

    /// First batch, returned by the select that opened the cursor
    buffered: Option<Vec<Vec<Value>>>,

    eof: bool,
}

impl Cursor {
    pub(crate) fn new() -> Cursor {
        Cursor {
            id: None,
            buffered: None,
            eof: true,
        }
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.eof && self.buffered.is_none()
    }

    pub(crate) async fn open(
        &mut self,
        session: &Session,
        statement: Statement,
        array_fetch_size: usize,
    ) -> Result<()> {
        self.close(session).await;

        let request = Request::new(statement).with_array_fetch_size(array_fetch_size);
        let response = session.exec(Operation::Select(request)).await?;

        self.eof = response.rows.len() < array_fetch_size;
        self.id = response.cursor;
        self.buffered = Some(response.rows);
        Ok(())
    }

    pub(crate) async fn next(
        &mut self,
        session: &Session,
        array_fetch_size: usize,
    ) -> Result<Vec<Vec<Value>>> {
        if let Some(rows) = self.buffered.take() {
            return Ok(rows);
        }

        if self.eof {
            return Ok(vec![]);
        }

        let Some(cursor) = self.id.clone() else {
            self.eof = true;
            return Ok(vec![]);
        };

        let response = session
            .exec(Operation::Fetch(Fetch {
                cursor,
                array_fetch_size,
            }))
            .await?;

        self.eof = response.rows.len() < array_fetch_size;
        Ok(response.rows)
    }

    /// Abandon the cursor. One that was not read to the end is closed on
    /// the backend; a failure to close is logged and otherwise ignored.
    pub(crate) async fn close(&mut self, session: &Session) {
        self.buffered = None;

        if let Some(cursor) = self.id.take() {
            if !self.eof {
                if let Err(err) = session.exec(Operation::Close { cursor }).await {
                    tracing::warn!(error = %err, "failed to close cursor");
                }
            }
        }

        self.eof = true;
    }
}
