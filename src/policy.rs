// Autorização explícita na camada de aplicação. Funções puras, sem banco:
// todo repositório/serviço passa por aqui antes de devolver ou gravar linhas.
pub mod access;
pub mod redaction;
pub mod subscription;
pub mod team;
