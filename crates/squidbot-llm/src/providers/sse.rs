use futures_util::StreamExt;

use crate::error::ProviderError;

/// Splits a byte stream from an SSE response into `data: ...` payload
/// strings, buffering across chunk boundaries. Comment lines and the
/// terminal `[DONE]` sentinel are filtered out by the caller.
pub async fn collect_sse_events(
    mut byte_stream: impl futures_util::Stream<Item = reqwest::Result<bytes::Bytes>> + Unpin,
    mut on_event: impl FnMut(&str),
) -> Result<(), ProviderError> {
    let mut buffer = String::new();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = chunk.map_err(ProviderError::from)?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buffer.find('\n') {
            let line = buffer[..pos].trim_end_matches('\r').to_string();
            buffer.drain(..=pos);

            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if data.is_empty() || data == "[DONE]" {
                    continue;
                }
                on_event(data);
            }
        }
    }

    Ok(())
}
