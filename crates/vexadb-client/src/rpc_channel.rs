//! Pooled TCP channel speaking the binary RPC framing.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use parking_lot::Mutex;
use prost::Message;
use tracing::debug;

use vexadb_common::error::{Error, Result};
use vexadb_proto::method::Method;

use crate::{decode_frame, encode_frame, ClientOptions};

pub(crate) struct RpcChannel {
    address: String,
    options: ClientOptions,
    pool: Mutex<Vec<TcpStream>>,
}

impl RpcChannel {
    pub(crate) fn new(address: &str, options: ClientOptions) -> Self {
        RpcChannel {
            address: address.to_string(),
            options,
            pool: Mutex::new(Vec::new()),
        }
    }

    /// One request/response exchange with transport retries.
    pub(crate) fn call<T: Message + Default>(
        &self,
        method: Method,
        request: &impl Message,
    ) -> Result<T> {
        let frame = encode_frame(method, request);
        let mut last_error = Error::RuntimeError;
        for attempt in 0..=self.options.retry_count {
            match self.exchange(&frame) {
                Ok(response) => return decode_frame(method, &response),
                Err(err) => {
                    debug!(
                        "Rpc exchange failed. attempt[{}] address[{}] error[{}]",
                        attempt, self.address, err
                    );
                    last_error = Error::ReadData;
                }
            }
        }
        Err(last_error)
    }

    fn exchange(&self, frame: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut stream = self.take_connection()?;
        let result = Self::exchange_on(&mut stream, frame);
        if result.is_ok() {
            self.put_connection(stream);
        }
        result
    }

    fn exchange_on(stream: &mut TcpStream, frame: &[u8]) -> std::io::Result<Vec<u8>> {
        stream.write_all(&(frame.len() as u32).to_be_bytes())?;
        stream.write_all(frame)?;
        stream.flush()?;

        let mut length = [0u8; 4];
        stream.read_exact(&mut length)?;
        let mut response = vec![0u8; u32::from_be_bytes(length) as usize];
        stream.read_exact(&mut response)?;
        Ok(response)
    }

    fn take_connection(&self) -> std::io::Result<TcpStream> {
        if let Some(stream) = self.pool.lock().pop() {
            return Ok(stream);
        }
        let timeout = Duration::from_millis(self.options.timeout_ms);
        let stream = TcpStream::connect(&self.address)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn put_connection(&self, stream: TcpStream) {
        let mut pool = self.pool.lock();
        if pool.len() < self.options.pool_size {
            pool.push(stream);
        }
    }
}
