//! Hashes de contenido calculados en una sola pasada.

use md5::Md5;
use sha2::{Digest, Sha256};
use std::io::{self, Read};

use crate::record::ContentHashes;

const CHUNK_SIZE: usize = 8192;

/// Calcula MD5 y SHA-256 leyendo el contenido por bloques, sin límite de tamaño.
pub fn content_hashes<R: Read + ?Sized>(reader: &mut R) -> io::Result<ContentHashes> {
    let mut md5 = Md5::new();
    let mut sha256 = Sha256::new();
    let mut buffer = [0_u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(bytes_read) => {
                md5.update(&buffer[..bytes_read]);
                sha256.update(&buffer[..bytes_read]);
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }

    Ok(ContentHashes {
        md5: format!("{:x}", md5.finalize()),
        sha256: format!("{:x}", sha256.finalize()),
    })
}
