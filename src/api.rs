use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use futures::TryStreamExt;

use crate::google_drive::{DriveFile, GoogleDrive, FOLDER};

/// Listings never go past the first page.
pub const PAGE_SIZE: u32 = 100;

lazy_static::lazy_static! {
    pub static ref FOLDER_QUERY: String = format!("mimeType = '{FOLDER}'");
}

pub fn parent_query(folder_id: &str) -> String {
    format!("'{folder_id}' in parents")
}

/// Builds the exact-name filter used by [`get_file_id_by_name`].
///
/// The name is interpolated as is: a name containing `'` yields a filter the
/// API rejects.
pub fn name_query(file_name: &str, parent_id: Option<&str>) -> String {
    let mut query = format!("name='{file_name}'");
    if let Some(p) = parent_id {
        query.push_str(" and ");
        query.push_str(&parent_query(p));
    }
    query
}

pub async fn upload_file(
    drive: &GoogleDrive,
    out: &mut impl Write,
    local_path: &Path,
    folder_id: Option<&str>,
) -> Result<String> {
    let f = drive
        .create_file(local_path, folder_id)
        .await
        .with_context(|| format!("Error uploading file {}", local_path.display()))?;

    writeln!(out, "Uploaded File ID: {}", f.id)?;
    Ok(f.id)
}

pub async fn download_file(
    drive: &GoogleDrive,
    out: &mut impl Write,
    file_id: &str,
    file_path: &Path,
) -> Result<()> {
    let context = || format!("Error downloading file {}", file_path.display());

    let progress = drive.download(file_id, file_path);
    futures::pin_mut!(progress);

    while let Some(p) = progress.try_next().await.with_context(context)? {
        writeln!(out, "Download {}%.", p.percent())?;
    }

    writeln!(out, "Downloaded file saved to: {}", file_path.display())?;
    Ok(())
}

pub async fn list_files(
    drive: &GoogleDrive,
    out: &mut impl Write,
    folder_id: Option<&str>,
) -> Result<Vec<DriveFile>> {
    let query = folder_id.map(parent_query);
    let files = drive.list(query.as_deref(), PAGE_SIZE).await?.files;

    print_listing(out, &files, "Files:", "No files found.")?;
    Ok(files)
}

pub async fn list_folders(drive: &GoogleDrive, out: &mut impl Write) -> Result<Vec<DriveFile>> {
    let folders = drive.list(Some(FOLDER_QUERY.as_str()), PAGE_SIZE).await?.files;

    print_listing(out, &folders, "Folders:", "No folders found.")?;
    Ok(folders)
}

pub async fn create_folder(
    drive: &GoogleDrive,
    out: &mut impl Write,
    folder_name: &str,
    parent_id: Option<&str>,
) -> Result<String> {
    let f = drive.create_dir(folder_name, parent_id).await?;

    writeln!(out, "Created Folder ID: {}", f.id)?;
    Ok(f.id)
}

/// Returns the id of the first file named exactly `file_name`.
pub async fn get_file_id_by_name(
    drive: &GoogleDrive,
    out: &mut impl Write,
    file_name: &str,
    parent_id: Option<&str>,
) -> Result<Option<String>> {
    let query = name_query(file_name, parent_id);
    let files = drive.list(Some(query.as_str()), 1).await?.files;

    match files.into_iter().next() {
        Some(f) => Ok(Some(f.id)),
        None => {
            writeln!(out, "No file found with name: {file_name}")?;
            Ok(None)
        }
    }
}

fn print_listing(
    out: &mut impl Write,
    files: &[DriveFile],
    header: &str,
    empty: &str,
) -> std::io::Result<()> {
    if files.is_empty() {
        return writeln!(out, "{empty}");
    }

    writeln!(out, "{header}")?;
    for f in files {
        writeln!(out, "{} ({})", f.name, f.id)?;
    }
    Ok(())
}
