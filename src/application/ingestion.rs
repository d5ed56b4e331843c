use anyhow::{anyhow, Result};
use log::info;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::domain::llm_provider::LlmProvider;
use crate::domain::vector_store::{RemoteFile, VectorStore};
use crate::infrastructure::file_system::discover_documents;

/// Uploads every document in order, printing `[-] wait <path>` before each.
/// The first failure aborts the whole batch.
pub async fn upload_documents<W>(
    provider: &dyn LlmProvider,
    documents: &[PathBuf],
    out: &mut W,
) -> Result<Vec<RemoteFile>>
where
    W: AsyncWrite + Unpin,
{
    let mut files = Vec::with_capacity(documents.len());
    for path in documents {
        out.write_all(format!("[-] wait {}\n", path.display()).as_bytes()).await?;
        out.flush().await?;
        files.push(provider.upload_file(path).await?);
    }
    info!("Uploaded {} documents", files.len());
    Ok(files)
}

/// Creates the vector store over files that have all finished uploading.
pub async fn create_store(provider: &dyn LlmProvider, name: &str, files: &[RemoteFile]) -> Result<VectorStore> {
    let file_ids: Vec<String> = files.iter().map(|f| f.id.clone()).collect();
    let store = provider.create_vector_store(name, &file_ids).await?;
    info!("Created vector store {} ('{}'), status {}", store.id, store.name, store.status);
    Ok(store)
}

/// Discovers, uploads and indexes the documents in `dir`.
pub async fn ingest_documents<W>(
    provider: &dyn LlmProvider,
    dir: &Path,
    extension: &str,
    store_name: &str,
    out: &mut W,
) -> Result<VectorStore>
where
    W: AsyncWrite + Unpin,
{
    let documents = discover_documents(dir, extension)?;
    if documents.is_empty() {
        return Err(anyhow!("No *.{} documents to upload in {:?}", extension, dir));
    }

    let files = upload_documents(provider, &documents, out).await?;
    create_store(provider, store_name, &files).await
}
