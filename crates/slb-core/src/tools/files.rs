//! File tools: external-flow uploads, listing, download, info, delete, share.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{api_args, schema, Session, Tool, ToolArgs, ToolContext, ToolRegistry};
use crate::{
    errors::{Error, RemoteError},
    formatting::{
        file_kind, format_file, format_file_line, format_size, str_at, text_or_na,
        truncate_with, Detail, FileKind, CONTENT_TRUNCATION_MARKER,
        FILE_CONTENT_LIMIT, NA,
    },
    Result,
};

const DEFAULT_FILENAME: &str = "file.txt";
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

const TEXT_MIME_PREFIXES: &[&str] = &[
    "text/",
    "application/json",
    "application/xml",
    "application/javascript",
    "application/x-yaml",
    "application/x-python",
    "application/x-sh",
];
const TEXT_FILETYPES: &[&str] = &[
    "text", "json", "xml", "yaml", "python", "javascript", "sh", "bash", "csv", "markdown",
];

pub fn register(reg: &mut ToolRegistry) {
    reg.register(UploadFile);
    reg.register(UploadFileToUser);
    reg.register(ListFiles);
    reg.register(GetFileContent);
    reg.register(GetFileInfo);
    reg.register(DeleteFile);
    reg.register(ShareFile);
}

fn upload_schema(target: schema::SchemaBuilder) -> Value {
    target
        .required_string("content", "File content as text")
        .string("filename", "File name (default: file.txt)")
        .string("filetype", "Snippet type, e.g. text, json, csv, python")
        .string("title", "File title")
        .string("initial_comment", "Message posted with the file")
        .build()
}

/// Validated upload fields shared by both upload tools.
struct UploadRequest {
    content: String,
    filename: String,
    filetype: Option<String>,
    title: Option<String>,
    initial_comment: Option<String>,
}

impl UploadRequest {
    fn from_args(args: &ToolArgs, max_bytes: usize) -> Result<Self> {
        let content = args.text("content")?;
        if content.len() > max_bytes {
            return Err(Error::validation(
                "content",
                format!(
                    "is {} but uploads are limited to {}",
                    format_size(content.len() as u64),
                    format_size(max_bytes as u64)
                ),
            ));
        }
        Ok(Self {
            content,
            filename: args
                .opt_text("filename")?
                .map(|f| f.trim().to_string())
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            filetype: args.opt_text("filetype")?,
            title: args.opt_text("title")?,
            initial_comment: args.opt_text("initial_comment")?,
        })
    }

    /// files.getUploadURLExternal → POST bytes → files.completeUploadExternal.
    async fn send(self, session: &Session<'_>, channels: &str) -> Result<Value> {
        let ticket = session
            .call(
                "files.getUploadURLExternal",
                api_args()
                    .set("filename", self.filename.as_str())
                    .set("length", self.content.len())
                    .set_opt("snippet_type", self.filetype.as_deref())
                    .build(),
            )
            .await?;
        let (Some(upload_url), Some(file_id)) =
            (str_at(&ticket, "/upload_url"), str_at(&ticket, "/file_id"))
        else {
            return Err(RemoteError::Transport(
                "files.getUploadURLExternal returned no upload URL".to_string(),
            )
            .into());
        };
        debug!(file_id, bytes = self.content.len(), "Uploading file content");

        session
            .upload_bytes(upload_url, &self.filename, self.content.into_bytes())
            .await?;

        let title = self.title.as_deref().unwrap_or(&self.filename);
        let resp = session
            .call(
                "files.completeUploadExternal",
                api_args()
                    .set("files", json!([{"id": file_id, "title": title}]))
                    .set("channels", channels)
                    .set_opt("initial_comment", self.initial_comment.as_deref())
                    .build(),
            )
            .await?;
        Ok(resp
            .pointer("/files/0")
            .cloned()
            .unwrap_or_else(|| json!({"id": file_id})))
    }
}

fn upload_summary(heading: &str, file: &Value, fallback_name: &str) -> String {
    let mut out = format!("✅ **{heading}**\n\n");
    out.push_str(&format!("• **File ID:** {}\n", text_or_na(file, "/id")));
    out.push_str(&format!(
        "• **Name:** {}\n",
        str_at(file, "/name").unwrap_or(fallback_name)
    ));
    if let Some(title) = str_at(file, "/title") {
        out.push_str(&format!("• **Title:** {title}\n"));
    }
    if let Some(size) = file.get("size").and_then(Value::as_u64) {
        out.push_str(&format!("• **Size:** {}\n", format_size(size)));
    }
    out
}

pub struct UploadFile;

#[async_trait]
impl Tool for UploadFile {
    fn name(&self) -> &'static str {
        "upload_file"
    }

    fn description(&self) -> &'static str {
        "Upload text content as a file and share it to one or more channels."
    }

    fn input_schema(&self) -> Value {
        upload_schema(
            schema::object().required_string("channels", "Comma-separated channel IDs"),
        )
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channels = args.csv("channels")?.join(",");
        let req = UploadRequest::from_args(&args, ctx.config().max_upload_bytes)?;
        let filename = req.filename.clone();
        let comment = req.initial_comment.clone();

        let file = req.send(&session, &channels).await?;

        let mut out = upload_summary("File Uploaded Successfully", &file, &filename);
        out.push_str(&format!("\n• **Shared to:** {channels}\n"));
        if let Some(c) = comment {
            out.push_str(&format!("• **Comment:** {c}\n"));
        }
        if let Some(link) = str_at(&file, "/permalink") {
            out.push_str(&format!("\n• **Permalink:** {link}\n"));
        }
        Ok(out)
    }
}

pub struct UploadFileToUser;

#[async_trait]
impl Tool for UploadFileToUser {
    fn name(&self) -> &'static str {
        "upload_file_to_user"
    }

    fn description(&self) -> &'static str {
        "Upload text content as a file into a direct message with a user."
    }

    fn input_schema(&self) -> Value {
        upload_schema(schema::object().required_string("user", "User ID to send the file to"))
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let user = args.id("user")?;
        let req = UploadRequest::from_args(&args, ctx.config().max_upload_bytes)?;
        let filename = req.filename.clone();
        let comment = req.initial_comment.clone();

        let opened = session
            .call("conversations.open", api_args().set("users", user.as_str()).build())
            .await?;
        let dm = str_at(&opened, "/channel/id")
            .ok_or_else(|| {
                RemoteError::Transport("conversations.open returned no channel id".to_string())
            })?
            .to_string();

        let file = req.send(&session, &dm).await?;

        let mut out = upload_summary("File Uploaded to User Successfully", &file, &filename);
        out.push_str(&format!("• **Recipient:** <@{user}>\n"));
        if let Some(c) = comment {
            out.push_str(&format!("\n• **Comment:** {c}\n"));
        }
        if let Some(link) = str_at(&file, "/permalink") {
            out.push_str(&format!("\n• **Permalink:** {link}\n"));
        }
        Ok(out)
    }
}

pub struct ListFiles;

#[async_trait]
impl Tool for ListFiles {
    fn name(&self) -> &'static str {
        "list_files"
    }

    fn description(&self) -> &'static str {
        "List files in the workspace, optionally filtered by channel, uploader or type."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .string("channel", "Only files shared in this channel")
            .string("user", "Only files uploaded by this user")
            .string("types", "Comma-separated file types, e.g. images,pdfs,zips")
            .integer("count", "Files per page", 20, 1, 100)
            .integer("page", "Page number", 1, 1, i64::from(u16::MAX))
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.opt_id("channel")?;
        let user = args.opt_id("user")?;
        let types = args.opt_text("types")?;
        let count = args.int_in("count", 20, 1, 100)?;
        let page = args.int_in("page", 1, 1, i64::from(u16::MAX))?;

        let resp = session
            .call(
                "files.list",
                api_args()
                    .set("count", count)
                    .set("page", page)
                    .set_opt("channel", channel)
                    .set_opt("user", user)
                    .set_opt("types", types)
                    .build(),
            )
            .await?;

        let files = resp
            .get("files")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let paging = |key: &str, default: u64| {
            resp.pointer(&format!("/paging/{key}"))
                .and_then(Value::as_u64)
                .unwrap_or(default)
        };
        let (current, pages, total) = (paging("page", 1), paging("pages", 1), paging("total", 0));

        let mut out = format!(
            "📁 **Files in Workspace** (Page {current}/{pages}, Total: {total})\n\n"
        );
        if files.is_empty() {
            out.push_str("No files found matching the criteria.\n");
            return Ok(out);
        }

        for (kind, title, shown) in [
            (FileKind::Image, "🖼️ Images", 5),
            (FileKind::Document, "📄 Documents", 5),
            (FileKind::Video, "🎥 Videos", 3),
            (FileKind::Other, "📎 Other Files", 5),
        ] {
            let group: Vec<&Value> = files.iter().filter(|f| file_kind(f) == kind).collect();
            if group.is_empty() {
                continue;
            }
            out.push_str(&format!("**{title} ({}):**\n", group.len()));
            for (i, f) in group.iter().take(shown).enumerate() {
                out.push_str(&format_file_line(i + 1, f));
            }
            if group.len() > shown {
                out.push_str(&format!("... and {} more\n", group.len() - shown));
            }
            out.push('\n');
        }

        if pages > 1 {
            out.push_str(&format!("**Navigation:** Page {current} of {pages}\n"));
            if current > 1 {
                out.push_str(&format!("• Previous page: use page={}\n", current - 1));
            }
            if current < pages {
                out.push_str(&format!("• Next page: use page={}\n", current + 1));
            }
        }
        Ok(out)
    }
}

fn is_text_file(file: &Value) -> bool {
    let mime = str_at(file, "/mimetype").unwrap_or("");
    TEXT_MIME_PREFIXES.iter().any(|p| mime.starts_with(p))
        || str_at(file, "/filetype").is_some_and(|t| TEXT_FILETYPES.contains(&t))
}

pub struct GetFileContent;

#[async_trait]
impl Tool for GetFileContent {
    fn name(&self) -> &'static str {
        "get_file_content"
    }

    fn description(&self) -> &'static str {
        "Download and show the content of a text file."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("file_id", "File ID (F1234567890)")
            .number("max_size_mb", "Largest file to download, in MB", 10.0)
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let file_id = args.id("file_id")?;
        let max_mb = args.positive_number_or("max_size_mb", 10.0)?;

        let info = session
            .call("files.info", api_args().set("file", file_id.as_str()).build())
            .await?;
        let file = info.get("file").cloned().unwrap_or(Value::Null);

        let size = file.get("size").and_then(Value::as_u64).unwrap_or(0);
        if size as f64 > max_mb * BYTES_PER_MB {
            return Err(Error::validation(
                "max_size_mb",
                format!(
                    "file is {:.1} MB, over the {max_mb} MB limit",
                    size as f64 / BYTES_PER_MB
                ),
            ));
        }
        if !is_text_file(&file) {
            return Err(Error::validation(
                "file_id",
                format!(
                    "file appears to be binary (MIME: {}); only text files are supported",
                    text_or_na(&file, "/mimetype")
                ),
            ));
        }
        let url = str_at(&file, "/url_private_download")
            .ok_or_else(|| Error::validation("file_id", "no download URL available for this file"))?;

        let content = session.download_text(url).await?;
        let kind = str_at(&file, "/mimetype")
            .or_else(|| str_at(&file, "/filetype"))
            .unwrap_or("unknown");

        let mut out = String::from("📄 **File Content Retrieved**\n\n");
        out.push_str(&format!(
            "**File:** {} (ID: {file_id})\n",
            str_at(&file, "/name").unwrap_or("Unknown")
        ));
        out.push_str(&format!("**Size:** {} characters\n", content.chars().count()));
        out.push_str(&format!("**Type:** {kind}\n\n"));
        out.push_str("**Content:**\n```\n");
        out.push_str(&truncate_with(
            &content,
            FILE_CONTENT_LIMIT,
            CONTENT_TRUNCATION_MARKER,
        ));
        out.push_str("\n```");
        Ok(out)
    }
}

pub struct GetFileInfo;

#[async_trait]
impl Tool for GetFileInfo {
    fn name(&self) -> &'static str {
        "get_file_info"
    }

    fn description(&self) -> &'static str {
        "Show a file's metadata, sharing and access links."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("file_id", "File ID")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let file_id = args.id("file_id")?;
        let info = session
            .call("files.info", api_args().set("file", file_id).build())
            .await?;
        let file = info.get("file").cloned().unwrap_or(Value::Null);
        Ok(format_file(&file, Detail::Full))
    }
}

pub struct DeleteFile;

#[async_trait]
impl Tool for DeleteFile {
    fn name(&self) -> &'static str {
        "delete_file"
    }

    fn description(&self) -> &'static str {
        "Permanently delete a file."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("file_id", "File ID to delete")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let file_id = args.id("file_id")?;

        let info = session
            .call("files.info", api_args().set("file", file_id.as_str()).build())
            .await?;
        let name = str_at(&info, "/file/name").unwrap_or("Unknown").to_string();
        session
            .call("files.delete", api_args().set("file", file_id.as_str()).build())
            .await?;

        Ok(format!(
            "✅ **File Deleted Successfully**\n\n• **File Name:** {name}\n• **File ID:** {file_id}\n• **Status:** Permanently deleted\n"
        ))
    }
}

fn share_blocks(comment: &str, name: &str, permalink: &str) -> Value {
    json!([
        {"type": "section", "text": {"type": "mrkdwn", "text": comment}},
        {"type": "section", "text": {"type": "mrkdwn", "text": format!("📎 *File:* <{permalink}|{name}>")}}
    ])
}

pub struct ShareFile;

#[async_trait]
impl Tool for ShareFile {
    fn name(&self) -> &'static str {
        "share_file"
    }

    fn description(&self) -> &'static str {
        "Share an existing file to channels by posting its link, reporting the result per channel."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("file_id", "File ID to share")
            .required_string("channels", "Comma-separated channel IDs")
            .string("comment", "Message to post with the file")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let file_id = args.id("file_id")?;
        let channels = args.csv("channels")?;
        let comment = args.opt_text("comment")?;

        let info = session
            .call("files.info", api_args().set("file", file_id.as_str()).build())
            .await?;
        let file = info.get("file").cloned().unwrap_or(Value::Null);
        let name = str_at(&file, "/name").unwrap_or("Unknown");
        let permalink = str_at(&file, "/permalink").unwrap_or(NA);
        let already: Vec<&str> = ["channels", "groups"]
            .iter()
            .filter_map(|k| file.get(*k).and_then(Value::as_array))
            .flatten()
            .filter_map(Value::as_str)
            .collect();

        let mut shared = Vec::new();
        let mut failed = Vec::new();
        for channel in &channels {
            if already.contains(&channel.as_str()) {
                shared.push(format!("<#{channel}> (already shared)"));
                continue;
            }
            let text = comment
                .clone()
                .unwrap_or_else(|| format!("Shared file: {name}\n{permalink}"));
            let blocks = comment
                .as_deref()
                .map(|c| share_blocks(c, name, permalink));
            let result = session
                .call(
                    "chat.postMessage",
                    api_args()
                        .set("channel", channel.as_str())
                        .set("text", text)
                        .set("unfurl_links", true)
                        .set("unfurl_media", true)
                        .set_opt("blocks", blocks)
                        .build(),
                )
                .await;
            match result {
                Ok(_) => shared.push(format!("<#{channel}>")),
                Err(Error::Remote(err)) => {
                    warn!(channel = %channel, "Sharing file failed: {}", err);
                    let reason = match &err {
                        RemoteError::Rejected { code, .. } => code.clone(),
                        RemoteError::Transport(msg) => format!("error: {msg}"),
                    };
                    failed.push(format!("{channel} ({reason})"));
                }
                Err(other) => return Err(other),
            }
        }

        let mut out = String::from("📤 **File Sharing Results**\n\n");
        out.push_str(&format!("**File:** {name} (ID: {file_id})\n\n"));
        if !shared.is_empty() {
            out.push_str("✅ **Successfully shared to:**\n");
            for s in &shared {
                out.push_str(&format!("• {s}\n"));
            }
        }
        if !failed.is_empty() {
            out.push_str("\n❌ **Failed to share to:**\n");
            for f in &failed {
                out.push_str(&format!("• {f}\n"));
            }
        }
        if let Some(c) = &comment {
            out.push_str(&format!("\n**Comment:** {c}\n"));
        }
        Ok(out)
    }
}
