use rand::Rng;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use hashkv::codec::DEFAULT_MAX_FRAME_SIZE;
use hashkv::server::serve;
use hashkv::store::Store;

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(serve(listener, Store::new(), DEFAULT_MAX_FRAME_SIZE));

    addr
}

/// A bare RESP client: requests are encoded by hand and replies are returned as raw bytes.
struct Client {
    stream: BufReader<TcpStream>,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Client {
        let stream = TcpStream::connect(addr).await.unwrap();
        Client {
            stream: BufReader::new(stream),
        }
    }

    async fn send(&mut self, args: &[&[u8]]) -> Vec<u8> {
        let mut req = format!("*{}\r\n", args.len()).into_bytes();
        for arg in args {
            req.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
            req.extend_from_slice(arg);
            req.extend_from_slice(b"\r\n");
        }
        self.send_raw(&req).await;
        self.read_reply().await
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.get_mut().write_all(bytes).await.unwrap();
    }

    /// Reads one complete reply. Arrays are followed by as many further values as they announce.
    async fn read_reply(&mut self) -> Vec<u8> {
        let mut reply = Vec::new();
        let mut pending = 1;

        while pending > 0 {
            pending -= 1;

            let start = reply.len();
            self.stream.read_until(b'\n', &mut reply).await.unwrap();

            let line = &reply[start..];
            let prefix = line[0];
            let header = String::from_utf8_lossy(&line[1..line.len() - 2]).into_owned();

            match prefix {
                b'$' if header != "-1" => {
                    let length: usize = header.parse().unwrap();
                    let mut payload = vec![0; length + 2];
                    self.stream.read_exact(&mut payload).await.unwrap();
                    reply.extend(payload);
                }
                b'*' => pending += header.parse::<usize>().unwrap(),
                _ => {}
            }
        }

        reply
    }
}

#[tokio::test]
async fn test_ping() {
    let mut client = Client::connect(start_server().await).await;

    assert_eq!(client.send(&[b"PING"]).await, b"+PONG\r\n");
    assert_eq!(client.send(&[b"PING", b"hello"]).await, b"+hello\r\n");
}

#[tokio::test]
async fn test_set_and_get() {
    let mut client = Client::connect(start_server().await).await;

    assert_eq!(client.send(&[b"SET", b"key_1", b"1"]).await, b"+OK\r\n");
    assert_eq!(client.send(&[b"SET", b"key_2", b""]).await, b"+OK\r\n");
    assert_eq!(
        client.send(&[b"SET", b"key_3", b"a\r\nb\x00"]).await,
        b"+OK\r\n"
    );

    assert_eq!(client.send(&[b"GET", b"key_1"]).await, b"$1\r\n1\r\n");
    assert_eq!(client.send(&[b"GET", b"key_2"]).await, b"$0\r\n\r\n");
    assert_eq!(
        client.send(&[b"GET", b"key_3"]).await,
        b"$5\r\na\r\nb\x00\r\n"
    );
    assert_eq!(client.send(&[b"GET", b"nonexistent"]).await, b"$-1\r\n");
}

#[tokio::test]
async fn test_hashes() {
    let mut client = Client::connect(start_server().await).await;

    assert_eq!(client.send(&[b"HSET", b"h", b"f1", b"v1"]).await, b"+OK\r\n");
    assert_eq!(client.send(&[b"HSET", b"h", b"f1", b"v2"]).await, b"+OK\r\n");
    assert_eq!(client.send(&[b"HSET", b"h", b"f2", b"v3"]).await, b"+OK\r\n");

    assert_eq!(client.send(&[b"HGET", b"h", b"f1"]).await, b"$2\r\nv2\r\n");
    assert_eq!(client.send(&[b"HGET", b"h", b"nope"]).await, b"$-1\r\n");
    assert_eq!(client.send(&[b"HGET", b"nope", b"f1"]).await, b"$-1\r\n");
    assert_eq!(client.send(&[b"HGETALL", b"nope"]).await, b"$-1\r\n");

    let reply = client.send(&[b"HGETALL", b"h"]).await;
    let one_order = b"*2\r\n$6\r\nf1: v2\r\n$6\r\nf2: v3\r\n".to_vec();
    let other_order = b"*2\r\n$6\r\nf2: v3\r\n$6\r\nf1: v2\r\n".to_vec();
    assert!(reply == one_order || reply == other_order, "{:?}", reply);
}

#[tokio::test]
async fn test_command_errors_keep_the_connection_open() {
    let mut client = Client::connect(start_server().await).await;

    assert_eq!(
        client.send(&[b"SET", b"a"]).await,
        b"-ERR wrong number of arguments for 'set' command\r\n"
    );
    assert_eq!(
        client.send(&[b"HGETALL"]).await,
        b"-ERR wrong number of arguments for 'hgetall' command\r\n"
    );
    assert_eq!(
        client.send(&[b"get", b"a"]).await,
        b"-ERR unknown command 'get'\r\n"
    );

    assert_eq!(client.send(&[b"GET", b"a"]).await, b"$-1\r\n");
}

#[tokio::test]
async fn test_pipelined_requests() {
    let mut client = Client::connect(start_server().await).await;

    client
        .send_raw(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
        .await;

    assert_eq!(client.read_reply().await, b"+OK\r\n");
    assert_eq!(client.read_reply().await, b"$1\r\nv\r\n");
}

#[tokio::test]
async fn test_decode_failure_closes_the_connection() {
    let mut client = Client::connect(start_server().await).await;

    client.send_raw(b"+PING\r\n").await;

    let mut buf = Vec::new();
    let read = client.stream.read_to_end(&mut buf).await.unwrap_or(0);
    assert_eq!(read, 0);
}

#[tokio::test]
async fn test_clients_share_the_store() {
    let addr = start_server().await;
    let mut writer = Client::connect(addr).await;
    let mut reader = Client::connect(addr).await;

    writer.send(&[b"SET", b"shared", b"yes"]).await;
    writer.send(&[b"HSET", b"shared", b"f", b"v"]).await;

    assert_eq!(reader.send(&[b"GET", b"shared"]).await, b"$3\r\nyes\r\n");
    assert_eq!(reader.send(&[b"HGET", b"shared", b"f"]).await, b"$1\r\nv\r\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_and_readers() {
    let addr = start_server().await;
    let keys: Vec<String> = (0..4).map(|i| format!("key_{i}")).collect();

    let mut handles = Vec::new();

    for key in keys.clone() {
        handles.push(tokio::spawn(async move {
            let mut client = Client::connect(addr).await;
            for _ in 0..100 {
                // Every value is one byte repeated, so a torn value would mix bytes.
                let (byte, len) = {
                    let mut rng = rand::thread_rng();
                    (rng.gen_range(b'a'..=b'z'), rng.gen_range(1..64))
                };
                let value = vec![byte; len];
                let reply = client.send(&[b"SET", key.as_bytes(), &value]).await;
                assert_eq!(reply, b"+OK\r\n");
            }
        }));
    }

    for _ in 0..4 {
        let keys = keys.clone();
        handles.push(tokio::spawn(async move {
            let mut client = Client::connect(addr).await;
            for _ in 0..100 {
                for key in &keys {
                    let reply = client.send(&[b"GET", key.as_bytes()]).await;
                    if reply == b"$-1\r\n" {
                        continue;
                    }

                    let header_end = reply.iter().position(|b| *b == b'\n').unwrap() + 1;
                    let length: usize = std::str::from_utf8(&reply[1..header_end - 2])
                        .unwrap()
                        .parse()
                        .unwrap();
                    let payload = &reply[header_end..reply.len() - 2];

                    assert_eq!(payload.len(), length);
                    assert!(payload.iter().all(|b| *b == payload[0]));
                }
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}
