//! In-memory release archives for integration tests

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::ZipWriter;

/// Zip archive bytes; names ending in '/' become directory entries
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, FileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Gzipped tar archive bytes
pub fn tar_gz_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Lowercase hex md5 of some bytes, as published next to an archive
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// PHP version file declaring a release
pub fn version_php(version: &str) -> String {
    format!(
        "<?php\n$fin_version = '{}';\n$fin_db_version = 58975;\n$tinymce_version = '4310-20160418';\n",
        version
    )
}
