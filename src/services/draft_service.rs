// src/services/draft_service.rs
//
// Cache de rascunho do assistente: o único mecanismo de recuperação de
// sessões interrompidas. Gravações são best-effort (disparadas a cada
// mutação, last-write-wins); a leitura descarta rascunhos com mais de
// 24 horas.

use chrono::Utc;
use uuid::Uuid;

use crate::{db::DraftRepository, models::wizard::WizardDraft, services::wizard_service};

#[derive(Clone)]
pub struct DraftService {
    repo: DraftRepository,
}

impl DraftService {
    pub fn new(repo: DraftRepository) -> Self {
        Self { repo }
    }

    /// Grava o rascunho. Erros são engolidos de propósito: perder um
    /// checkpoint não pode atrapalhar a digitação da fatura.
    pub async fn save(&self, user_id: Uuid, draft: &WizardDraft) {
        if let Err(e) = self.repo.upsert(user_id, draft).await {
            tracing::warn!("Falha ao gravar rascunho do usuário {}: {}", user_id, e);
        }
    }

    /// Carrega o rascunho, se existir e ainda estiver dentro da janela de
    /// 24 horas. Rascunhos vencidos ou ilegíveis são apagados e tratados
    /// como ausentes.
    pub async fn load(&self, user_id: Uuid) -> Option<WizardDraft> {
        let draft = match self.repo.fetch(user_id).await {
            Ok(Some(draft)) => draft,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Falha ao ler rascunho do usuário {}: {}", user_id, e);
                self.clear(user_id).await;
                return None;
            }
        };

        if wizard_service::is_draft_expired(&draft, Utc::now()) {
            self.clear(user_id).await;
            return None;
        }

        Some(draft)
    }

    pub async fn clear(&self, user_id: Uuid) {
        if let Err(e) = self.repo.delete(user_id).await {
            tracing::warn!("Falha ao limpar rascunho do usuário {}: {}", user_id, e);
        }
    }
}
