//! Static-storage access.
//!
//! Slave storage is addressed by a 32-bit byte offset and organized in
//! pages. Writes must start at a page boundary; a write shorter than a
//! page erases the remainder of that page. On top of the raw paged
//! operations sits a NUL-terminated string convenience layer.

use crate::backend::Backend;
use crate::device::Device;
use crate::error::BusError;
use chainbus_protocol::{
    DeviceRequest, StorageGeometry, STORAGE_GEOMETRY_LEN, STORAGE_READ_OVERHEAD,
    STORAGE_STATUS_ADDRESS_SIZE, STORAGE_STATUS_OK, STORAGE_WRITE_OVERHEAD,
};
use tracing::trace;

/// Largest chunk the string reader requests per iteration.
const MAX_STRING_CHUNK: usize = 256;

/// Map a storage status byte to an outcome.
fn check_status(status: u8) -> Result<(), BusError> {
    match status {
        STORAGE_STATUS_OK => Ok(()),
        STORAGE_STATUS_ADDRESS_SIZE => Err(BusError::DeviceStaticStorageAddressSize),
        _ => Err(BusError::DeviceStaticStorageWrite),
    }
}

impl<B: Backend> Device<B> {
    /// Read the storage capacity and page size.
    pub async fn storage_geometry(&self) -> Result<StorageGeometry, BusError> {
        let payload = self
            .transceive(&DeviceRequest::StorageGeometry.encode(), STORAGE_GEOMETRY_LEN)
            .await?;
        Ok(StorageGeometry::decode(&payload)?)
    }

    /// Read `len` bytes starting at `offset`, splitting the transfer into
    /// frame-sized chunks.
    pub async fn read_storage(&self, offset: u32, len: usize) -> Result<Vec<u8>, BusError> {
        let buffer_size = self.buffer_size().await? as usize;
        let max_chunk = buffer_size.saturating_sub(STORAGE_READ_OVERHEAD);
        if max_chunk == 0 {
            return Err(BusError::DeviceStaticStorageAddressSize);
        }

        let mut out = Vec::with_capacity(len);
        let mut cursor = offset;
        while out.len() < len {
            let chunk = (len - out.len()).min(max_chunk).min(u16::MAX as usize);
            let reply = self
                .transceive(
                    &DeviceRequest::StorageRead {
                        offset: cursor,
                        len: chunk as u16,
                    }
                    .encode(),
                    1 + chunk,
                )
                .await?;
            check_status(reply[0])?;
            out.extend_from_slice(&reply[1..]);
            cursor += chunk as u32;
        }
        Ok(out)
    }

    /// Write `data` starting at `offset`, which must be a multiple of the
    /// page size. Chunks are whole pages except possibly the last; data
    /// running past the capacity is truncated. When even a single page
    /// does not fit in one frame, the write fails before anything is
    /// sent.
    pub async fn write_storage(&self, offset: u32, data: &[u8]) -> Result<(), BusError> {
        let geometry = self.storage_geometry().await?;
        let page_size = geometry.page_size.max(1) as usize;
        if offset as usize % page_size != 0 || offset > geometry.capacity {
            return Err(BusError::DeviceStaticStorageAddressSize);
        }

        let buffer_size = self.buffer_size().await? as usize;
        let budget = buffer_size.saturating_sub(STORAGE_WRITE_OVERHEAD);
        let pages_per_frame = budget / page_size;
        if pages_per_frame == 0 {
            return Err(BusError::DeviceStaticStorageAddressSize);
        }
        let max_chunk = pages_per_frame * page_size;

        // Over-length writes at the end truncate to the capacity.
        let available = (geometry.capacity - offset) as usize;
        let data = &data[..data.len().min(available)];

        let mut cursor = offset;
        for chunk in data.chunks(max_chunk) {
            trace!(offset = cursor, len = chunk.len(), "storage write chunk");
            let reply = self
                .transceive(
                    &DeviceRequest::StorageWrite {
                        offset: cursor,
                        data: chunk.to_vec(),
                    }
                    .encode(),
                    1,
                )
                .await?;
            check_status(reply[0])?;
            cursor += chunk.len() as u32;
        }
        Ok(())
    }

    /// Read a NUL-terminated UTF-8 string starting at `offset`, scanning
    /// at most `max_read_size` bytes.
    pub async fn read_string_from_storage(
        &self,
        offset: u32,
        max_read_size: usize,
    ) -> Result<String, BusError> {
        let geometry = self.storage_geometry().await?;
        let buffer_size = self.buffer_size().await? as usize;
        let chunk_cap = MAX_STRING_CHUNK.min(buffer_size.saturating_sub(1));

        let available = (geometry.capacity.saturating_sub(offset)) as usize;
        let limit = max_read_size.min(available);

        let mut collected: Vec<u8> = Vec::new();
        while collected.len() < limit {
            let want = chunk_cap.min(limit - collected.len());
            let chunk = self.read_storage(offset + collected.len() as u32, want).await?;
            if let Some(nul) = chunk.iter().position(|&b| b == 0) {
                collected.extend_from_slice(&chunk[..nul]);
                break;
            }
            collected.extend_from_slice(&chunk);
        }

        String::from_utf8(collected).map_err(|_| BusError::Unspecified)
    }

    /// Write a string at `offset`, NUL-terminated and truncated so it
    /// fits the capacity with its terminator. The final chunk is padded
    /// with NULs to a whole page.
    pub async fn write_string_to_storage(&self, offset: u32, value: &str) -> Result<(), BusError> {
        let geometry = self.storage_geometry().await?;
        let page_size = geometry.page_size.max(1) as usize;
        if offset >= geometry.capacity {
            return Err(BusError::DeviceStaticStorageAddressSize);
        }

        let available = (geometry.capacity - offset) as usize;
        let text_len = value.len().min(available.saturating_sub(1));

        let mut bytes = Vec::with_capacity(text_len + page_size);
        bytes.extend_from_slice(&value.as_bytes()[..text_len]);
        bytes.push(0);

        // Pad to a page boundary; the padding doubles as the terminator
        // region and keeps every emitted chunk a whole page.
        let padded = bytes.len().div_ceil(page_size) * page_size;
        bytes.resize(padded.min(available), 0);

        self.write_storage(offset, &bytes).await
    }
}
