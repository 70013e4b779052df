use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// One `[topic, payload]` multipart record.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Bytes,
}

async fn write_part<W: AsyncWriteExt + Unpin>(writer: &mut W, part: &[u8]) -> std::io::Result<()> {
    writer.write_all(&(part.len() as u32).to_be_bytes()).await?;
    writer.write_all(part).await?;
    Ok(())
}

pub async fn write_message<W: AsyncWriteExt + Unpin>(writer: &mut W, msg: &BusMessage) -> std::io::Result<()> {
    write_part(writer, msg.topic.as_bytes()).await?;
    write_part(writer, &msg.payload).await?;
    writer.flush().await
}

async fn read_part<R: AsyncReadExt + Unpin>(reader: &mut R, max_len: u32) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > max_len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("bus part length {len} exceeds ceiling {max_len}"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

pub async fn read_message<R: AsyncReadExt + Unpin>(reader: &mut R, max_len: u32) -> std::io::Result<BusMessage> {
    let topic_bytes = read_part(reader, max_len).await?;
    let payload = read_part(reader, max_len).await?;
    let topic = String::from_utf8(topic_bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(BusMessage {
        topic,
        payload: Bytes::from(payload),
    })
}

pub const DEFAULT_MAX_PART_LEN: u32 = 64 * 1024 * 1024;
