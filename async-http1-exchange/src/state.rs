use http1_exchange_spec::body_framing::BodyFraming;

use crate::error::ExchangeError;

//
//
//
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Created,
    HeadersSent,
    OutputClosed,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestBodyState {
    Unconsumed,
    Consuming,
    Consumed,
    Abandoned,
}

#[derive(Debug)]
pub struct ExchangeState {
    phase: Phase,
    request_body: RequestBodyState,
    status_code: i32,
    response_framing: Option<BodyFraming>,
    output_exact: bool,
    broken: bool,
    close_requested: bool,
}

impl Default for ExchangeState {
    fn default() -> Self {
        Self {
            phase: Phase::Created,
            request_body: RequestBodyState::Unconsumed,
            status_code: -1,
            response_framing: None,
            output_exact: false,
            broken: false,
            close_requested: false,
        }
    }
}

impl ExchangeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn request_body_state(&self) -> RequestBodyState {
        self.request_body
    }
    pub fn status_code(&self) -> i32 {
        self.status_code
    }
    pub fn response_framing(&self) -> Option<BodyFraming> {
        self.response_framing
    }
    pub fn is_broken(&self) -> bool {
        self.broken
    }
    pub fn is_close_requested(&self) -> bool {
        self.close_requested
    }

    //
    pub fn ensure_created(&self) -> Result<(), ExchangeError> {
        if self.phase != Phase::Created {
            return Err(ExchangeError::Sequencing("response headers already sent"));
        }
        Ok(())
    }

    pub fn ensure_headers_sent(&self) -> Result<(), ExchangeError> {
        if self.phase < Phase::HeadersSent {
            return Err(ExchangeError::Sequencing("response headers not sent"));
        }
        Ok(())
    }

    pub fn send_headers(
        &mut self,
        status_code: u16,
        framing: BodyFraming,
    ) -> Result<(), ExchangeError> {
        self.ensure_created()?;

        self.status_code = i32::from(status_code);
        self.response_framing = Some(framing);
        self.phase = Phase::HeadersSent;
        Ok(())
    }

    //
    pub fn request_body_read(&mut self, n: usize, completed: bool) {
        if matches!(self.request_body, RequestBodyState::Abandoned) {
            return;
        }
        if completed {
            self.request_body = RequestBodyState::Consumed;
        } else if n > 0 {
            self.request_body = RequestBodyState::Consuming;
        }
    }

    pub fn abandon_request_body(&mut self) {
        if self.request_body != RequestBodyState::Consumed {
            self.request_body = RequestBodyState::Abandoned;
        }
    }

    pub fn output_closed(&mut self, exact: bool) {
        if self.phase < Phase::OutputClosed {
            self.phase = Phase::OutputClosed;
            self.output_exact = exact;
        }
    }

    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn terminate(&mut self) {
        self.phase = Phase::Terminated;
    }

    pub fn is_reusable(&self) -> bool {
        self.phase == Phase::Terminated
            && self.request_body == RequestBodyState::Consumed
            && self.output_exact
            && !self.broken
            && !self.close_requested
    }
}
