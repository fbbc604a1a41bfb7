// src/services/audit.rs

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db::AuditStore;
use crate::models::audit::AuditEntry;

/// Recebe registros de auditoria sem bloquear a requisição.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

// ---
// Fila limitada + tarefa em segundo plano que grava no AuditStore
// ---
pub struct QueuedAuditSink {
    sender: Mutex<Option<mpsc::Sender<AuditEntry>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueuedAuditSink {
    /// Cria a fila e dispara o worker. Precisa estar dentro de um runtime tokio.
    pub fn spawn(store: Arc<dyn AuditStore>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<AuditEntry>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(entry) = receiver.recv().await {
                if let Err(e) = store.insert(&entry).await {
                    // Falha de auditoria nunca derruba a operação principal.
                    tracing::error!(
                        "🔥 Falha ao gravar auditoria ({} em {}): {}",
                        entry.action,
                        entry.target_table,
                        e
                    );
                }
            }
        });

        Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Fecha a fila e espera o worker gravar o que já foi enfileirado.
    pub async fn shutdown(&self) {
        self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!("🔥 Worker de auditoria terminou com erro: {}", e);
            }
        }
    }
}

impl AuditSink for QueuedAuditSink {
    fn record(&self, entry: AuditEntry) {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = sender.as_ref() else {
            tracing::warn!("Auditoria descartada após o desligamento: {}", entry.action);
            return;
        };

        match sender.try_send(entry) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(entry)) => {
                tracing::warn!("⚠️ Fila de auditoria cheia, registro descartado: {} em {}", entry.action, entry.target_table);
            }
            Err(mpsc::error::TrySendError::Closed(entry)) => {
                tracing::warn!("⚠️ Fila de auditoria fechada, registro descartado: {}", entry.action);
            }
        }
    }
}
