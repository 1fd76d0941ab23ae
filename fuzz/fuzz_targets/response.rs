#![no_main]

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use webrequest::auth::{AuthRegistry, Credential};
use webrequest::net::{Connection, Connector};
use webrequest::{Config, Deadline, Error, Services, WebRequest};

/// Every connection replays the fuzz input as the server response.
struct Replay(Vec<u8>);

struct Peer(Cursor<Vec<u8>>);

impl Read for Peer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for Peer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connector for Replay {
    fn connect(&self, _: &str, _: u16, _: Deadline) -> Result<Connection, Error> {
        Ok(Connection::new(Box::new(Peer(Cursor::new(self.0.clone())))))
    }
}

fuzz_target!(|data: &[u8]| {
    let services = Services {
        connector: Arc::new(Replay(data.to_vec())),
        tls: None,
        auth: Arc::new(AuthRegistry::default()),
    };

    let Ok(mut request) = WebRequest::with_services("http://fuzz.test/", Config::default(), services)
    else {
        return;
    };
    request.set_credentials(Some(Arc::new(Credential::new("user", "pass"))));

    if let Ok(mut response) = request.get_response() {
        let mut body = Vec::new();
        let _ = response.read_to_end(&mut body);
    }
});
