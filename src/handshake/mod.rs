mod state;
mod c0c1;
mod s0s1s2;

pub use state::*;
pub use c0c1::*;
pub use s0s1s2::*;

use crate::{Error, Result};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

async fn read_exact_handshake<S: AsyncRead + Unpin>(stream: &mut S, len: usize, what: &str) -> Result<Vec<u8>> {
    let mut data = vec![0u8; len];
    stream
        .read_exact(&mut data)
        .await
        .map_err(|e| Error::handshake(format!("Failed to read {}: {}", what, e)))?;
    Ok(data)
}

/// Run the server side of the simple handshake
pub async fn server_handshake<S>(stream: &mut S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut state = HandshakeState::default();

    let c0c1 = C0C1::parse(&read_exact_handshake(stream, 1 + HANDSHAKE_SIZE, "C0+C1").await?)?;
    let s0s1s2 = S0S1S2::generate(&c0c1);
    stream.write_all(&s0s1s2.encode()?).await?;
    stream.flush().await?;
    state.transition(HandshakeEvent::ReceivedC0C1)?;

    let c2 = C2::parse(&read_exact_handshake(stream, HANDSHAKE_SIZE, "C2").await?)?;
    if !c2.matches(&s0s1s2) {
        warn!("C2 does not echo S1, continuing anyway");
    }
    state.transition(HandshakeEvent::ReceivedC2)?;

    debug!("Handshake complete");
    Ok(())
}

/// Run the client side of the simple handshake
pub async fn client_handshake<S>(stream: &mut S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&C0C1::create_client().encode()?).await?;
    stream.flush().await?;

    let s0s1s2 = S0S1S2::parse(&read_exact_handshake(stream, 1 + HANDSHAKE_SIZE * 2, "S0+S1+S2").await?)?;
    stream.write_all(&C2::from_s1(&s0s1s2).encode()?).await?;
    stream.flush().await?;
    Ok(())
}
