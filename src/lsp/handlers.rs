use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::*;

use crate::core::path::{ArcDirection, MotionKind, MotionSegment};
use crate::lsp::backend::Backend;
use crate::lsp::document::DocumentState;
use crate::validation::Severity;

/// Value of `source` on published diagnostics
pub const DIAGNOSTIC_SOURCE: &str = "gcode-toolpath";

/// Trait for handling hover requests
#[tower_lsp::async_trait]
pub trait HandleHover {
    async fn handle_hover(&self, params: HoverParams) -> LspResult<Option<Hover>>;
}

/// Trait for handling document symbols
#[tower_lsp::async_trait]
pub trait HandleDocumentSymbol {
    async fn handle_document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> LspResult<Option<DocumentSymbolResponse>>;
}

/// Trait for handling diagnostics
#[tower_lsp::async_trait]
pub trait HandleDiagnostics {
    async fn create_document_state(&self, content: String) -> DocumentState;
    async fn publish_diagnostics(&self, uri: Url);
    fn create_lsp_diagnostic(
        &self,
        doc_state: &DocumentState,
        diagnostic: &crate::core::path::Diagnostic,
    ) -> Diagnostic;
}

#[tower_lsp::async_trait]
impl HandleHover for Backend {
    async fn handle_hover(&self, params: HoverParams) -> LspResult<Option<Hover>> {
        let tdpp = params.text_document_position_params;
        let uri = tdpp.text_document.uri;
        let line_no = tdpp.position.line as usize + 1;

        let docs = self.documents.lock().await;
        let doc_state = match docs.get(&uri) {
            Some(state) => state,
            None => return Ok(None),
        };

        Ok(hover_for_line(doc_state, line_no))
    }
}

#[tower_lsp::async_trait]
impl HandleDiagnostics for Backend {
    /// Parse the content with the configured options
    async fn create_document_state(&self, content: String) -> DocumentState {
        DocumentState::new(content, &self.config.parser)
    }

    /// Publish diagnostics for a document
    async fn publish_diagnostics(&self, uri: Url) {
        let docs = self.documents.lock().await;
        let doc_state = match docs.get(&uri) {
            Some(state) => state,
            None => return,
        };

        let diagnostics: Vec<Diagnostic> = doc_state
            .result
            .diagnostics()
            .map(|d| self.create_lsp_diagnostic(doc_state, d))
            .collect();
        drop(docs);

        log::debug!("publishing {} diagnostics for {}", diagnostics.len(), uri);
        self.client
            .publish_diagnostics(uri, diagnostics, None)
            .await;
    }

    fn create_lsp_diagnostic(
        &self,
        doc_state: &DocumentState,
        diagnostic: &crate::core::path::Diagnostic,
    ) -> Diagnostic {
        to_lsp_diagnostic(doc_state, diagnostic)
    }
}

#[tower_lsp::async_trait]
impl HandleDocumentSymbol for Backend {
    async fn handle_document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> LspResult<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;

        let docs = self.documents.lock().await;
        let doc_state = match docs.get(&uri) {
            Some(state) => state,
            None => return Ok(None),
        };

        Ok(Some(DocumentSymbolResponse::Nested(layer_symbols(
            doc_state,
        ))))
    }
}

/// Whole-line diagnostic for a parse diagnostic
pub fn to_lsp_diagnostic(
    doc_state: &DocumentState,
    diagnostic: &crate::core::path::Diagnostic,
) -> Diagnostic {
    let severity = match diagnostic.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    };
    let line = diagnostic.line_no.saturating_sub(1) as u32;

    Diagnostic::new(
        Range::new(
            Position::new(line, 0),
            Position::new(line, doc_state.line_width(diagnostic.line_no)),
        ),
        Some(severity),
        Some(NumberOrString::String(diagnostic.kind.as_str().to_string())),
        Some(DIAGNOSTIC_SOURCE.to_string()),
        diagnostic.message.clone(),
        None,
        None,
    )
}

/// One symbol per layer, spanning its marker to its last segment
pub fn layer_symbols(doc_state: &DocumentState) -> Vec<DocumentSymbol> {
    let result = &doc_state.result;

    result
        .layers
        .iter()
        .map(|layer| {
            let segments = result.layer_segments(layer).count();
            let last_line = result
                .layer_segments(layer)
                .last()
                .map_or(layer.line_no, |s| s.line_no);

            let marker_line = layer.line_no.saturating_sub(1) as u32;
            let range = Range::new(
                Position::new(marker_line, 0),
                Position::new(
                    last_line.saturating_sub(1) as u32,
                    doc_state.line_width(last_line),
                ),
            );
            let selection_range = Range::new(
                Position::new(marker_line, 0),
                Position::new(marker_line, doc_state.line_width(layer.line_no)),
            );

            DocumentSymbol {
                name: format!("Layer {}", layer.index),
                detail: Some(format!("{} segments", segments)),
                kind: SymbolKind::NAMESPACE,
                tags: None,
                // Required by tower-lsp 0.20, use tags instead in future versions
                #[allow(deprecated)]
                deprecated: Some(false),
                range,
                selection_range,
                children: None,
            }
        })
        .collect()
}

/// Markdown summary of the motion produced by a line, if any
pub fn hover_for_line(doc_state: &DocumentState, line_no: usize) -> Option<Hover> {
    let segment = doc_state
        .result
        .motions()
        .find(|s| s.line_no == line_no)?;

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: describe_segment(segment),
        }),
        range: None,
    })
}

fn describe_segment(segment: &MotionSegment) -> String {
    let title = match (segment.kind, segment.direction) {
        (MotionKind::Rapid, _) => "Rapid move",
        (MotionKind::Feed, _) => "Feed move",
        (MotionKind::Arc, Some(ArcDirection::CounterClockwise)) => "Counter-clockwise arc",
        (MotionKind::Arc, _) => "Clockwise arc",
    };
    let (s, e) = (segment.start, segment.end);

    let mut text = format!(
        "**{}**\n\n({:.3}, {:.3}, {:.3}) -> ({:.3}, {:.3}, {:.3})",
        title, s.x, s.y, s.z, e.x, e.y, e.z
    );
    if let (Some(radius), Some(center)) = (segment.radius, segment.center()) {
        text.push_str(&format!(
            "\n\nRadius {:.3}, center ({:.3}, {:.3}, {:.3})",
            radius, center.x, center.y, center.z
        ));
    }
    if let Some(feed) = segment.feed_rate {
        text.push_str(&format!("\n\nFeed {} mm/min", feed));
    }
    text.push_str(&format!(
        "\n\n{} {:?}",
        segment.plane.gcode(),
        segment.coord_system
    ));
    text
}
