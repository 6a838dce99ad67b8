use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::Record;
use tracing::{debug, error, warn};

use crate::dns_types::{ErrorCode, RecordType};
use crate::error::Result;
use crate::forwarder::{forward_to_resolver, MAX_PACKET_SIZE};
use crate::local::create_answer_records;
use crate::server::ProxyServer;
use crate::transport::{Resolver, Transaction, Transport};

/// Most datagrams handled at once; anything beyond is dropped
pub const MAX_WORKERS: usize = 256;

/// Plain UDP listener. Every datagram is handled on its own thread.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    workers: WorkerSlots,
}

impl UdpTransport {
    /// Bind the listening socket; port 0 picks an ephemeral port
    pub fn bind(host: &str, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind((host, port))?;
        Ok(Self {
            socket: Arc::new(socket),
            workers: WorkerSlots::new(MAX_WORKERS),
        })
    }

    /// Address the socket is actually bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn serve(self, server: Arc<ProxyServer>) -> Result<()> {
        let mut buf = [0u8; MAX_PACKET_SIZE];

        loop {
            let (size, source) = match self.socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) => {
                    error!(error = %e, "Error receiving data");
                    return Err(e.into());
                }
            };
            debug!(bytes = size, %source, "Received query");

            let Some(slot) = self.workers.acquire() else {
                warn!(%source, limit = self.workers.limit, "Too many queries in flight, dropping");
                continue;
            };

            let packet = Bytes::copy_from_slice(&buf[..size]);
            let socket = Arc::clone(&self.socket);
            let server = Arc::clone(&server);

            let spawned = thread::Builder::new()
                .name("dns-query".to_string())
                .spawn(move || {
                    let _slot = slot;
                    if let Some(response) = handle_packet(&server, packet) {
                        if let Err(e) = socket.send_to(&response, source) {
                            warn!(error = %e, %source, "Failed to send response");
                        }
                    }
                });

            if let Err(e) = spawned {
                error!(error = %e, %source, "Failed to spawn query worker");
            }
        }
    }
}

/// Counts in-flight query workers against a fixed limit
#[derive(Debug, Clone)]
struct WorkerSlots {
    in_flight: Arc<AtomicUsize>,
    limit: usize,
}

/// Held by a worker; frees its slot when dropped, panics included
#[derive(Debug)]
struct WorkerSlot {
    in_flight: Arc<AtomicUsize>,
}

impl WorkerSlots {
    fn new(limit: usize) -> Self {
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            limit,
        }
    }

    fn acquire(&self) -> Option<WorkerSlot> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .ok()
            .map(|_| WorkerSlot {
                in_flight: Arc::clone(&self.in_flight),
            })
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Decode one datagram, run it through the server and return the reply, if any
pub fn handle_packet(server: &ProxyServer, packet: Bytes) -> Option<Bytes> {
    let request = match Message::from_vec(&packet) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Dropping undecodable query");
            return None;
        }
    };

    let mut transaction = UdpTransaction::new(request, packet);
    dispatch(server, &mut transaction);
    transaction.into_response()
}

fn dispatch(server: &ProxyServer, transaction: &mut UdpTransaction) {
    let Some(query) = transaction.query().cloned() else {
        warn!(id = transaction.request.id(), "Query without a question");
        transaction.fail_with(ErrorCode::FormErr);
        return;
    };

    let name = query_name(&query);
    let rtype = match RecordType::try_from(u16::from(query.query_type())) {
        Ok(rtype) => rtype,
        Err(e) => {
            warn!(error = %e, query = %name, "Unsupported query type");
            transaction.fail_with(ErrorCode::NotImp);
            return;
        }
    };

    if let Err(e) = server.process(&name, rtype, transaction) {
        warn!(error = %e, %rtype, query = %name, "Query processing failed");
        transaction.fail_with(ErrorCode::ServFail);
    }
}

/// Queried name as rules see it: wire (ASCII) form, without the trailing
/// root dot
fn query_name(query: &Query) -> String {
    query.name().to_ascii().trim_end_matches('.').to_string()
}

fn response_code(code: ErrorCode) -> ResponseCode {
    match code {
        ErrorCode::NoError => ResponseCode::NoError,
        ErrorCode::FormErr => ResponseCode::FormErr,
        ErrorCode::ServFail => ResponseCode::ServFail,
        ErrorCode::NXDomain => ResponseCode::NXDomain,
        ErrorCode::NotImp => ResponseCode::NotImp,
        ErrorCode::Refused => ResponseCode::Refused,
        ErrorCode::NotAuth => ResponseCode::NotAuth,
    }
}

/// Transaction bound to one decoded UDP query. The last action taken decides
/// the reply; no action means no reply.
pub struct UdpTransaction {
    request: Message,
    packet: Bytes,
    response: Option<Bytes>,
}

impl UdpTransaction {
    /// Wrap a decoded request together with its raw datagram
    pub fn new(request: Message, packet: Bytes) -> Self {
        Self {
            request,
            packet,
            response: None,
        }
    }

    fn query(&self) -> Option<&Query> {
        self.request.queries().first()
    }

    /// The encoded reply, or `None` when no action was taken
    pub fn into_response(self) -> Option<Bytes> {
        self.response
    }

    /// Build a reply echoing the request's id, opcode and questions
    fn reply(&self, code: ErrorCode, answers: Vec<Record>) -> Message {
        let mut response = Message::new();
        response
            .set_id(self.request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(self.request.op_code())
            .set_recursion_desired(self.request.recursion_desired())
            .set_recursion_available(true)
            .set_response_code(response_code(code));
        response.add_queries(self.request.queries().to_vec());
        response.add_answers(answers);
        response
    }

    /// Encode the reply; one that cannot be encoded becomes a bare ServFail
    fn finish(&mut self, message: Message) {
        self.response = match message.to_vec() {
            Ok(bytes) => Some(Bytes::from(bytes)),
            Err(e) => {
                error!(error = %e, id = message.id(), "Failed to encode response");
                self.reply(ErrorCode::ServFail, Vec::new())
                    .to_vec()
                    .map(Bytes::from)
                    .ok()
            }
        };
    }
}

impl Transaction for UdpTransaction {
    fn respond_with(&mut self, values: &[String]) {
        let records = self.query().and_then(|query| {
            let rtype = RecordType::from_u16(u16::from(query.query_type()))?;
            match create_answer_records(rtype, query.name(), values) {
                Ok(records) => Some(records),
                Err(e) => {
                    warn!(error = %e, query = %query_name(query), "Cannot build local answer");
                    None
                }
            }
        });

        let message = match records {
            Some(records) => self.reply(ErrorCode::NoError, records),
            None => self.reply(ErrorCode::ServFail, Vec::new()),
        };
        self.finish(message);
    }

    fn fail_with(&mut self, code: ErrorCode) {
        let message = self.reply(code, Vec::new());
        self.finish(message);
    }

    fn passthrough(&mut self, resolver: &Resolver) {
        match forward_to_resolver(resolver, &self.packet) {
            Ok(response) => self.response = Some(response),
            Err(e) => {
                warn!(error = %e, id = self.request.id(), "Passthrough failed");
                let message = self.reply(ErrorCode::ServFail, Vec::new());
                self.finish(message);
            }
        }
    }
}
