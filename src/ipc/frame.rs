//! Length-prefixed JSON framing shared by server and client

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted message body
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Send a length-prefixed JSON message
pub async fn write_frame<W, T>(stream: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    stream.write_all(&msg_len).await?;
    stream.write_all(&msg_bytes).await?;

    Ok(())
}

/// Read a length-prefixed JSON message
///
/// Returns `None` when the peer closed the connection between messages.
pub async fn read_frame<R, T>(stream: &mut R) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        bail!("message too large ({len} bytes)");
    }

    let mut msg_buf = vec![0u8; len];
    stream.read_exact(&mut msg_buf).await?;

    let msg = serde_json::from_slice(&msg_buf).context("failed to parse message")?;
    Ok(Some(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::Request;

    #[tokio::test]
    async fn test_frame_through_duplex() {
        let (mut a, mut b) = tokio::io::duplex(256);

        write_frame(&mut a, &Request::SetAudioTime { time: "12:00".into() })
            .await
            .unwrap();
        let req: Option<Request> = read_frame(&mut b).await.unwrap();
        assert!(matches!(req, Some(Request::SetAudioTime { time }) if time == "12:00"));

        drop(a);
        let eof: Option<Request> = read_frame(&mut b).await.unwrap();
        assert!(eof.is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_refused() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&((MAX_FRAME_LEN as u32) + 1).to_le_bytes())
            .await
            .unwrap();

        let result: Result<Option<Request>> = read_frame(&mut b).await;
        assert!(result.is_err());
    }
}
