/// Synthetic exchange server
///
/// Streams a run of sequenced records, randomly dropping some so the client
/// has gaps to recover, and serves single-sequence resend requests.
/// Useful for exercising the client end to end:
///
///   cargo run --example feed_server -- 3000 100
///   cargo run -- --port 3000

use feed_recovery::{encode_record, CallType, Record};
use rand::Rng;
use std::env;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const DROP_RATE: f64 = 0.15;

fn make_record(seq: u32) -> Record {
    let symbols: [&[u8; 4]; 4] = [b"AAPL", b"MSFT", b"AMZN", b"GOOG"];
    Record {
        symbol: *symbols[seq as usize % symbols.len()],
        side: if seq % 3 == 0 { b'S' } else { b'B' },
        quantity: 10 + seq % 90,
        price: 100_00 + seq * 7,
        sequence: seq,
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args: Vec<String> = env::args().collect();
    let port: u16 = args.get(1).and_then(|a| a.parse().ok()).unwrap_or(3000);
    let total: u32 = args.get(2).and_then(|a| a.parse().ok()).unwrap_or(100);

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    println!("feed server on 127.0.0.1:{port}, {total} records");

    loop {
        let (mut sock, addr) = listener.accept().await?;

        let mut request = [0u8; 2];
        if sock.read_exact(&mut request).await.is_err() {
            continue;
        }

        match CallType::from_u8(request[0]) {
            Some(CallType::StreamAll) => {
                let mut rng = rand::thread_rng();
                let mut burst = Vec::new();
                let mut dropped = 0u32;
                for seq in 1..=total {
                    // Never drop the last record so max_sequence is known.
                    if seq != total && rng.gen_bool(DROP_RATE) {
                        dropped += 1;
                        continue;
                    }
                    burst.extend_from_slice(&encode_record(&make_record(seq)));
                }
                sock.write_all(&burst).await?;
                println!("{addr}: streamed {} records ({dropped} dropped)", total - dropped);
            }
            Some(CallType::ResendOne) => {
                let seq = request[1] as u32;
                sock.write_all(&encode_record(&make_record(seq))).await?;
                println!("{addr}: resent sequence {seq}");
            }
            None => {
                eprintln!("{addr}: unknown call type {}", request[0]);
            }
        }
    }
}
