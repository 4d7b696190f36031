use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

pub(crate) fn file_read(filename: &Path) -> std::io::Result<Vec<u8>>
{
    let mut buf = Vec::<u8>::with_capacity(0x1000);
    File::open(filename)?.read_to_end(&mut buf)?;
    buf.shrink_to_fit();
    Ok(buf)
}

pub(crate) fn file_write(filename: &Path, data: &[u8]) -> std::io::Result<()>
{
    File::create(filename)?.write_all(data)
}
